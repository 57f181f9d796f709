//! Error types for the Hearth engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the Hearth engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("transaction not found: {0}")]
    RecordNotFound(RecordId),

    #[error("transaction already exists: {0}")]
    RecordAlreadyExists(RecordId),

    #[error("operation on deleted transaction: {0}")]
    OperationOnDeleted(RecordId),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unsupported snapshot format version: {actual} (max supported: {supported})")]
    SnapshotVersionMismatch { supported: u32, actual: u32 },

    #[error("household mismatch: expected '{expected}', got '{actual}'")]
    HouseholdMismatch { expected: String, actual: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
