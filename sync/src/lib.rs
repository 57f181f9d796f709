//! # Hearth Sync
//!
//! The async half of Hearth's offline-first core: durable snapshot storage,
//! the remote-service seam, and the sync processor that reconciles queued
//! local edits with the remote service once connectivity returns.
//!
//! The UI layer holds one [`SyncSession`] per household login. Mutations go
//! through the session, which persists a snapshot after every change and
//! debounces a drain. The drain walks the queue in FIFO order, retries
//! transport failures with backoff, resolves moot operations silently, and
//! freezes genuinely conflicting records for one-sided resolution via
//! [`SyncSession::resolve_conflict`].
//!
//! ```no_run
//! use hearth_sync::{AlwaysOnline, FileStorage, SyncConfig, SyncSession};
//! # use hearth_sync::{NewRemoteTransaction, RemoteError, RemoteService};
//! # use hearth_engine::{RemoteRecord, TransactionFields};
//! # use std::sync::Arc;
//! # struct Service;
//! # #[async_trait::async_trait]
//! # impl RemoteService for Service {
//! #     async fn insert_transaction(&self, _: NewRemoteTransaction) -> Result<RemoteRecord, RemoteError> { unimplemented!() }
//! #     async fn fetch_transaction(&self, _: &str) -> Result<RemoteRecord, RemoteError> { unimplemented!() }
//! #     async fn update_transaction(&self, _: &str, _: TransactionFields) -> Result<RemoteRecord, RemoteError> { unimplemented!() }
//! #     async fn soft_delete_transaction(&self, _: &str) -> Result<(), RemoteError> { unimplemented!() }
//! # }
//! # async fn open() -> hearth_sync::Result<()> {
//! let session = SyncSession::open(
//!     "household-1",
//!     SyncConfig::default(),
//!     Box::new(FileStorage::new("hearth.json")),
//!     Arc::new(Service),
//!     Arc::new(AlwaysOnline),
//! )
//! .await?;
//!
//! let _events = session.subscribe();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod processor;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use config::{ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use event::{SyncEvent, SyncSummary};
pub use remote::{
    AlwaysOnline, Connectivity, NewRemoteTransaction, RemoteError, RemoteService,
};
pub use session::SyncSession;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};
