//! Per-household sync session.
//!
//! A [`SyncSession`] is the engine/context object the UI layer talks to,
//! constructed once per household login and dropped on logout. It owns the
//! in-memory store, persists a snapshot through [`SnapshotStorage`] after
//! every mutation, and drives the sync processor and scheduler.

use crate::{
    config::SyncConfig,
    error::Result,
    event::SyncEvent,
    remote::{Connectivity, RemoteService},
    storage::SnapshotStorage,
};
use chrono::Utc;
use hearth_engine::{
    CachedQuery, DeleteOutcome, Error as EngineError, HouseholdId, OfflineRecord, Period,
    QueryKey, RecordId, Store, Timestamp, TransactionFields, TransactionFilter,
    TransactionPatch,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Wall-clock milliseconds since epoch.
pub(crate) fn now_ms() -> Timestamp {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// One household's offline store plus the machinery that reconciles it with
/// the remote service.
///
/// All store and processor operations are cooperative async tasks; the
/// store mutex is held across individual store operations, never across
/// remote calls.
pub struct SyncSession {
    pub(crate) household_id: HouseholdId,
    pub(crate) config: SyncConfig,
    pub(crate) store: Mutex<Store>,
    pub(crate) storage: Box<dyn SnapshotStorage>,
    pub(crate) remote: Arc<dyn RemoteService>,
    pub(crate) connectivity: Arc<dyn Connectivity>,
    events: broadcast::Sender<SyncEvent>,
    /// Guard against re-entrant drains
    pub(crate) is_syncing: AtomicBool,
    /// Pending debounce timer, if any
    pub(crate) scheduled: Mutex<Option<JoinHandle<()>>>,
    /// Self-handle for the tasks the scheduler spawns
    pub(crate) weak: Weak<SyncSession>,
}

impl SyncSession {
    /// Open a session, restoring state from storage if a snapshot exists.
    pub async fn open(
        household_id: impl Into<HouseholdId>,
        config: SyncConfig,
        storage: Box<dyn SnapshotStorage>,
        remote: Arc<dyn RemoteService>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Arc<Self>> {
        let household_id = household_id.into();

        let store = match storage.load().await? {
            Some(snapshot) => {
                if snapshot.household_id != household_id {
                    return Err(EngineError::HouseholdMismatch {
                        expected: household_id,
                        actual: snapshot.household_id,
                    }
                    .into());
                }
                let store = Store::from_snapshot(snapshot)?;
                tracing::info!(
                    household_id = %household_id,
                    pending = store.pending_sync_count(),
                    "restored session from snapshot"
                );
                store
            }
            None => Store::new(household_id.clone()),
        };

        let (events, _) = broadcast::channel(64);
        Ok(Arc::new_cyclic(|weak| Self {
            household_id,
            config,
            store: Mutex::new(store),
            storage,
            remote,
            connectivity,
            events,
            is_syncing: AtomicBool::new(false),
            scheduled: Mutex::new(None),
            weak: weak.clone(),
        }))
    }

    pub fn household_id(&self) -> &HouseholdId {
        &self.household_id
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    pub(crate) async fn persist(&self, store: &Store) -> Result<()> {
        self.storage.save(&store.export_state()).await?;
        Ok(())
    }

    /// Create a transaction while offline. Returns the client-generated id
    /// the record is known by until the remote service assigns its own.
    pub async fn add_transaction(
        &self,
        fields: TransactionFields,
    ) -> Result<RecordId> {
        let id = format!("local-{}", Uuid::new_v4());
        {
            let mut store = self.store.lock().await;
            store.add_transaction(id.clone(), fields, now_ms())?;
            self.persist(&store).await?;
        }
        tracing::debug!(transaction_id = %id, "queued offline create");
        self.schedule_sync().await;
        Ok(id)
    }

    /// Apply a partial update to a transaction.
    pub async fn update_transaction(
        &self,
        id: &str,
        patch: TransactionPatch,
    ) -> Result<()> {
        {
            let mut store = self.store.lock().await;
            store.update_transaction(id, patch, now_ms())?;
            self.persist(&store).await?;
        }
        tracing::debug!(transaction_id = %id, "queued offline update");
        self.schedule_sync().await;
        Ok(())
    }

    /// Delete a transaction.
    pub async fn delete_transaction(&self, id: &str) -> Result<DeleteOutcome> {
        let outcome = {
            let mut store = self.store.lock().await;
            let outcome = store.delete_transaction(id, now_ms())?;
            self.persist(&store).await?;
            outcome
        };
        tracing::debug!(transaction_id = %id, ?outcome, "deleted transaction");
        if outcome == DeleteOutcome::Queued {
            self.schedule_sync().await;
        }
        Ok(outcome)
    }

    /// Locally held transactions not yet confirmed by the remote service.
    pub async fn transactions(&self, filter: &TransactionFilter) -> Vec<OfflineRecord> {
        let store = self.store.lock().await;
        store
            .transactions(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of mutations waiting to be synced.
    pub async fn pending_sync_count(&self) -> usize {
        self.store.lock().await.pending_sync_count()
    }

    /// Records currently in conflict.
    pub async fn conflicts(&self) -> Vec<OfflineRecord> {
        let store = self.store.lock().await;
        store.conflicts().into_iter().cloned().collect()
    }

    /// Accept the remote version of a conflicted record. Idempotent: the
    /// second call on the same id is a no-op returning `Ok(false)`.
    pub async fn resolve_conflict(&self, id: &str) -> Result<bool> {
        let resolved = {
            let mut store = self.store.lock().await;
            let resolved = store.resolve_conflict(id)?;
            if resolved {
                self.persist(&store).await?;
            }
            resolved
        };
        if resolved {
            tracing::info!(transaction_id = %id, "conflict resolved, remote accepted");
        }
        Ok(resolved)
    }

    /// Store a remote query result for offline reads.
    pub async fn cache_query(
        &self,
        period: Period,
        currency: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        let key = QueryKey::new(self.household_id.clone(), period, currency);
        let mut store = self.store.lock().await;
        store.cache_query(&key, data, now_ms());
        self.persist(&store).await
    }

    /// Read a cached query result; `is_stale` derives from its age against
    /// the configured max age.
    pub async fn cached_query(&self, period: Period, currency: &str) -> Option<CachedQuery> {
        let key = QueryKey::new(self.household_id.clone(), period, currency);
        let store = self.store.lock().await;
        store.cached_query(&key, now_ms(), self.config.cache_max_age)
    }

    /// Wipe all local state. Used on logout/reset.
    pub async fn clear_all(&self) -> Result<()> {
        self.cancel_scheduled_sync().await;
        let mut store = self.store.lock().await;
        store.clear_all();
        self.persist(&store).await?;
        tracing::info!(household_id = %self.household_id, "cleared local state");
        Ok(())
    }
}
