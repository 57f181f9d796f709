//! Unified error handling for the sync layer.

use crate::storage::StorageError;

/// Errors surfaced to callers of the session's mutation API.
///
/// Remote-call failures never appear here: the processor converts them into
/// queue-item state and events instead (see
/// [`process_sync`](crate::SyncSession::process_sync)).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("engine error: {0}")]
    Engine(#[from] hearth_engine::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SyncError>;
