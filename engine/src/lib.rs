//! # Hearth Engine
//!
//! The deterministic offline-first core of Hearth, a household budgeting
//! app.
//!
//! This crate holds the local state of one household's transactions: the
//! record store, the sync queue with its coalescing rules, and the
//! read-through query cache. It decides *what* must be told to the remote
//! service; actually talking to it (and persisting snapshots) is the job of
//! the `hearth-sync` crate.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: ids and timestamps are supplied by the caller, so
//!   the same inputs always produce the same outputs
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! One [`OfflineRecord`] per transaction known to the client, carrying the
//! typed [`TransactionFields`], a [`SyncStatus`], a local edit counter, and
//! the remote version stamp recorded at last sync. A record in conflict
//! keeps the remote row it diverged from until the caller resolves it.
//!
//! ### Sync Queue
//!
//! Every local mutation appends a [`QueueOperation`] for its record. The
//! queue holds at most one item per record: appending coalesces (create
//! absorbs updates, delete supersedes, delete-of-unsynced vanishes), so a
//! burst of edits nets exactly one remote call.
//!
//! ### Snapshots
//!
//! [`StoreSnapshot`] is the persistence bridge: `BTreeMap`-ordered, so the
//! same state always serializes to the same document.
//!
//! ## Quick Start
//!
//! ```rust
//! use hearth_engine::{Store, TransactionFields, TransactionPatch};
//! use chrono::NaiveDate;
//!
//! let mut store = Store::new("household-1");
//!
//! let fields = TransactionFields {
//!     date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
//!     amount_minor: -5000,
//!     currency: "USD".into(),
//!     category: Some("groceries".into()),
//!     note: None,
//! };
//! store.add_transaction("local-1", fields, 1_000).unwrap();
//!
//! let patch = TransactionPatch {
//!     amount_minor: Some(-5500),
//!     ..Default::default()
//! };
//! store.update_transaction("local-1", patch, 2_000).unwrap();
//!
//! // A burst of edits still nets a single queued create.
//! assert_eq!(store.pending_sync_count(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod queue;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod transaction;

// Re-export main types at crate root
pub use cache::{CacheEntry, CachedQuery, QueryKey};
pub use error::Error;
pub use queue::{BackoffSchedule, Coalesced, QueueItem, QueueOperation, SyncQueue};
pub use record::{OfflineRecord, RemoteRecord, SyncStatus};
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{DeleteOutcome, Store};
pub use transaction::{Period, TransactionFields, TransactionFilter, TransactionPatch};

/// Type aliases for clarity
pub type RecordId = String;
pub type HouseholdId = String;
pub type Timestamp = u64;
