//! Store - the in-memory state container.
//!
//! The Store holds the three collections of the offline core: transaction
//! records, the sync queue, and the query cache. All state transitions go
//! through its API, which is what preserves the one-queue-item-per-record
//! invariant. The store is deterministic: ids and timestamps are supplied
//! by the caller, and durability is the caller's job via
//! [`export_state`](Store::export_state) / [`from_snapshot`](Store::from_snapshot).

use crate::{
    error::Result, CacheEntry, CachedQuery, Error, HouseholdId, OfflineRecord, QueryKey,
    QueueItem, QueueOperation, RecordId, RemoteRecord, StoreSnapshot, SyncQueue, SyncStatus,
    Timestamp, TransactionFields, TransactionFilter, TransactionPatch,
};
use std::collections::HashMap;
use std::time::Duration;

/// How a local delete was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record never reached the remote service and was dropped outright
    Discarded,
    /// The record was tombstoned and a delete queued for the remote service
    Queued,
}

/// The main store holding all local state for one household.
#[derive(Debug, Clone)]
pub struct Store {
    household_id: HouseholdId,
    records: HashMap<RecordId, OfflineRecord>,
    queue: SyncQueue,
    cache: HashMap<String, CacheEntry>,
}

impl Store {
    /// Create an empty store for a household.
    pub fn new(household_id: impl Into<HouseholdId>) -> Self {
        Self {
            household_id: household_id.into(),
            records: HashMap::new(),
            queue: SyncQueue::new(),
            cache: HashMap::new(),
        }
    }

    pub fn household_id(&self) -> &HouseholdId {
        &self.household_id
    }

    /// Add a transaction created locally.
    ///
    /// The caller supplies the client-generated id. The record starts
    /// `pending` and a `create` is queued.
    pub fn add_transaction(
        &mut self,
        id: impl Into<RecordId>,
        fields: TransactionFields,
        now: Timestamp,
    ) -> Result<()> {
        let id = id.into();
        if self.records.contains_key(&id) {
            return Err(Error::RecordAlreadyExists(id));
        }

        self.records
            .insert(id.clone(), OfflineRecord::new_local(id.clone(), fields.clone(), now));
        self.queue
            .push(id, QueueOperation::Create { fields }, now);
        Ok(())
    }

    /// Apply a partial update to a transaction.
    ///
    /// A previously synced record is demoted to `pending` and an `update`
    /// queued. A record already `pending` has the patch coalesced into its
    /// existing queue entry. A record in `conflict` is frozen: the fields
    /// change locally but nothing is queued until the conflict is resolved.
    pub fn update_transaction(
        &mut self,
        id: &str,
        patch: TransactionPatch,
        now: Timestamp,
    ) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if record.deleted {
            return Err(Error::OperationOnDeleted(id.to_string()));
        }

        record.fields.apply(&patch);
        record.local_version += 1;

        match record.sync_status {
            SyncStatus::Synced => {
                record.sync_status = SyncStatus::Pending;
                self.queue
                    .push(id, QueueOperation::Update { patch }, now);
            }
            SyncStatus::Pending => {
                self.queue
                    .push(id, QueueOperation::Update { patch }, now);
            }
            SyncStatus::Conflict => {}
        }
        Ok(())
    }

    /// Delete a transaction.
    ///
    /// A record that never reached the remote service is removed outright
    /// together with its queue entry. Anything else is tombstoned and a
    /// `delete` queued, superseding any pending create/update.
    pub fn delete_transaction(&mut self, id: &str, now: Timestamp) -> Result<DeleteOutcome> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if record.deleted {
            return Err(Error::OperationOnDeleted(id.to_string()));
        }

        if record.never_synced() {
            self.records.remove(id);
            self.queue.remove(id);
            return Ok(DeleteOutcome::Discarded);
        }

        record.deleted = true;
        record.local_version += 1;
        record.sync_status = SyncStatus::Pending;
        // A delete expresses intent regardless of divergence; drop any
        // conflict snapshot along with it.
        record.server_snapshot = None;
        self.queue.push(id, QueueOperation::Delete, now);
        Ok(DeleteOutcome::Queued)
    }

    /// Get an active (non-tombstoned) record.
    pub fn transaction(&self, id: &str) -> Option<&OfflineRecord> {
        self.records.get(id).filter(|r| r.is_active())
    }

    /// Get a record including tombstones. Used by the sync processor.
    pub fn record(&self, id: &str) -> Option<&OfflineRecord> {
        self.records.get(id)
    }

    /// Locally held transactions that have not yet been confirmed by the
    /// remote service: pending and conflicted records, tombstones excluded.
    /// The UI merges these over the cached authoritative remote view.
    pub fn transactions(&self, filter: &TransactionFilter) -> Vec<&OfflineRecord> {
        let mut matching: Vec<&OfflineRecord> = self
            .records
            .values()
            .filter(|r| r.is_active())
            .filter(|r| r.sync_status != SyncStatus::Synced)
            .filter(|r| filter.matches(&r.fields))
            .collect();
        matching.sort_by(|a, b| a.fields.date.cmp(&b.fields.date).then_with(|| a.id.cmp(&b.id)));
        matching
    }

    /// Number of mutations waiting to be synced.
    pub fn pending_sync_count(&self) -> usize {
        self.queue.len()
    }

    /// Confirm a record against a written remote row.
    ///
    /// Atomically re-keys the record from `local_id` to the remote id and
    /// absorbs the row (fields, version stamp, `synced` status).
    pub fn mark_synced(&mut self, local_id: &str, remote: RemoteRecord) -> Result<()> {
        let mut record = self
            .records
            .remove(local_id)
            .ok_or_else(|| Error::RecordNotFound(local_id.to_string()))?;
        record.id = remote.id.clone();
        record.apply_remote(remote);
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Freeze a record in conflict, keeping the remote row for resolution.
    pub fn mark_conflict(&mut self, id: &str, remote: RemoteRecord) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        record.mark_conflict(remote);
        Ok(())
    }

    /// All records currently in conflict.
    pub fn conflicts(&self) -> Vec<&OfflineRecord> {
        let mut matching: Vec<&OfflineRecord> = self
            .records
            .values()
            .filter(|r| r.sync_status == SyncStatus::Conflict)
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        matching
    }

    /// Accept the stored server snapshot for a conflicted record.
    ///
    /// Returns `Ok(false)` when the record is not in conflict — calling
    /// twice has the same effect as once.
    pub fn resolve_conflict(&mut self, id: &str) -> Result<bool> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if !record.resolve_with_server() {
            return Ok(false);
        }
        self.queue.remove(id);
        Ok(true)
    }

    /// Remove a record outright. Used by the sync processor when the remote
    /// side already reflects the terminal state (moot operations, confirmed
    /// deletes).
    pub fn remove_transaction(&mut self, id: &str) -> Option<OfflineRecord> {
        self.records.remove(id)
    }

    // Queue access for the sync processor

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Clone the queue in FIFO order by `created_at`.
    pub fn queue_fifo(&self) -> Vec<QueueItem> {
        self.queue.to_fifo_vec()
    }

    /// Record a failed dispatch on a queue entry.
    pub fn record_attempt(
        &mut self,
        id: &str,
        now: Timestamp,
        error: impl Into<String>,
    ) -> bool {
        self.queue.record_attempt(id, now, error)
    }

    /// Remove the queue entry for a transaction.
    pub fn remove_queue_item(&mut self, id: &str) -> Option<QueueItem> {
        self.queue.remove(id)
    }

    // Cache

    /// Store a remote query result.
    pub fn cache_query(&mut self, key: &QueryKey, data: serde_json::Value, now: Timestamp) {
        self.cache
            .insert(key.canonical(), CacheEntry::new(data, now));
    }

    /// Read a cached query result; staleness is derived from its age.
    pub fn cached_query(
        &self,
        key: &QueryKey,
        now: Timestamp,
        max_age: Duration,
    ) -> Option<CachedQuery> {
        self.cache.get(&key.canonical()).map(|entry| CachedQuery {
            data: entry.data.clone(),
            is_stale: entry.is_stale(now, max_age),
        })
    }

    /// Wipe all three collections. Used on logout/reset.
    pub fn clear_all(&mut self) {
        self.records.clear();
        self.queue.clear();
        self.cache.clear();
    }

    // Persistence

    /// Export the current state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new(self.household_id.clone());
        for record in self.records.values() {
            snapshot.add_record(record.clone());
        }
        snapshot.queue = self.queue.to_fifo_vec();
        for (key, entry) in &self.cache {
            snapshot.cache.insert(key.clone(), entry.clone());
        }
        snapshot
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;
        Ok(Self {
            household_id: snapshot.household_id,
            records: snapshot
                .records
                .into_iter()
                .collect(),
            queue: SyncQueue::from_items(snapshot.queue),
            cache: snapshot.cache.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Period;
    use chrono::NaiveDate;
    use serde_json::json;

    fn fields(amount_minor: i64) -> TransactionFields {
        TransactionFields {
            date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            amount_minor,
            currency: "USD".into(),
            category: Some("groceries".into()),
            note: None,
        }
    }

    fn amount_patch(amount_minor: i64) -> TransactionPatch {
        TransactionPatch {
            amount_minor: Some(amount_minor),
            ..Default::default()
        }
    }

    fn remote(id: &str, amount_minor: i64, updated_at: Timestamp) -> RemoteRecord {
        RemoteRecord {
            id: id.into(),
            household_id: "hh-1".into(),
            fields: fields(amount_minor),
            updated_at,
            deleted: false,
        }
    }

    fn store_with_synced(id: &str) -> Store {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();
        store.mark_synced("local-1", remote(id, -5000, 2000)).unwrap();
        store.remove_queue_item("local-1");
        store
    }

    #[test]
    fn add_enqueues_create() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();

        let record = store.transaction("local-1").unwrap();
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert_eq!(record.local_version, 1);
        assert_eq!(store.pending_sync_count(), 1);
        assert!(matches!(
            store.queue().get("local-1").unwrap().operation,
            QueueOperation::Create { .. }
        ));
    }

    #[test]
    fn add_duplicate_id() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();
        let result = store.add_transaction("local-1", fields(-1), 2000);
        assert!(matches!(result, Err(Error::RecordAlreadyExists(_))));
    }

    #[test]
    fn create_update_update_nets_one_create() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();
        store
            .update_transaction("local-1", amount_patch(-5500), 2000)
            .unwrap();
        store
            .update_transaction(
                "local-1",
                TransactionPatch {
                    note: Some(Some("adjusted".into())),
                    ..Default::default()
                },
                3000,
            )
            .unwrap();

        assert_eq!(store.pending_sync_count(), 1);
        match &store.queue().get("local-1").unwrap().operation {
            QueueOperation::Create { fields } => {
                assert_eq!(fields.amount_minor, -5500);
                assert_eq!(fields.note.as_deref(), Some("adjusted"));
            }
            other => panic!("expected create, got {}", other.kind()),
        }

        let record = store.transaction("local-1").unwrap();
        assert_eq!(record.local_version, 3);
        assert_eq!(record.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn update_missing_record() {
        let mut store = Store::new("hh-1");
        let result = store.update_transaction("ghost", amount_patch(-1), 1000);
        assert!(matches!(result, Err(Error::RecordNotFound(_))));
    }

    #[test]
    fn update_synced_record_demotes_and_queues() {
        let mut store = store_with_synced("srv-1");
        assert_eq!(store.pending_sync_count(), 0);

        store
            .update_transaction("srv-1", amount_patch(-6000), 3000)
            .unwrap();

        let record = store.transaction("srv-1").unwrap();
        assert_eq!(record.sync_status, SyncStatus::Pending);
        assert_eq!(record.fields.amount_minor, -6000);
        assert!(matches!(
            store.queue().get("srv-1").unwrap().operation,
            QueueOperation::Update { .. }
        ));
    }

    #[test]
    fn delete_never_synced_discards_everything() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();

        let outcome = store.delete_transaction("local-1", 2000).unwrap();
        assert_eq!(outcome, DeleteOutcome::Discarded);
        assert!(store.transaction("local-1").is_none());
        assert!(store.record("local-1").is_none());
        assert_eq!(store.pending_sync_count(), 0);
    }

    #[test]
    fn update_then_delete_on_synced_nets_one_delete() {
        let mut store = store_with_synced("srv-1");
        store
            .update_transaction("srv-1", amount_patch(-6000), 3000)
            .unwrap();
        let outcome = store.delete_transaction("srv-1", 4000).unwrap();

        assert_eq!(outcome, DeleteOutcome::Queued);
        assert_eq!(store.pending_sync_count(), 1);
        assert_eq!(
            store.queue().get("srv-1").unwrap().operation,
            QueueOperation::Delete
        );

        // tombstoned, no longer visible to queries
        assert!(store.transaction("srv-1").is_none());
        assert!(store.record("srv-1").unwrap().deleted);
    }

    #[test]
    fn delete_twice_errors() {
        let mut store = store_with_synced("srv-1");
        store.delete_transaction("srv-1", 3000).unwrap();
        let result = store.delete_transaction("srv-1", 4000);
        assert!(matches!(result, Err(Error::OperationOnDeleted(_))));
    }

    #[test]
    fn update_tombstoned_record_errors() {
        let mut store = store_with_synced("srv-1");
        store.delete_transaction("srv-1", 3000).unwrap();
        let result = store.update_transaction("srv-1", amount_patch(-1), 4000);
        assert!(matches!(result, Err(Error::OperationOnDeleted(_))));
    }

    #[test]
    fn mark_synced_rekeys_record() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-5000), 1000).unwrap();

        store
            .mark_synced("local-1", remote("srv-9", -5000, 2000))
            .unwrap();

        assert!(store.transaction("local-1").is_none());
        let record = store.transaction("srv-9").unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.server_version, Some(2000));
        assert_eq!(record.offline_created_at, None);
    }

    #[test]
    fn conflict_freezes_record_until_resolved() {
        let mut store = store_with_synced("srv-1");
        store
            .update_transaction("srv-1", amount_patch(-6000), 3000)
            .unwrap();

        store
            .mark_conflict("srv-1", remote("srv-1", -7000, 4000))
            .unwrap();
        store.remove_queue_item("srv-1");

        // Local edit while frozen: fields change, nothing queued.
        store
            .update_transaction("srv-1", amount_patch(-6500), 5000)
            .unwrap();
        assert_eq!(store.pending_sync_count(), 0);
        assert_eq!(store.conflicts().len(), 1);

        // Resolution accepts remote, discarding the local edits.
        assert!(store.resolve_conflict("srv-1").unwrap());
        let record = store.transaction("srv-1").unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.fields.amount_minor, -7000);
        assert_eq!(record.server_version, Some(4000));
        assert!(store.conflicts().is_empty());

        // Idempotent: second resolve is a no-op.
        assert!(!store.resolve_conflict("srv-1").unwrap());
    }

    #[test]
    fn resolve_missing_record() {
        let mut store = Store::new("hh-1");
        assert!(matches!(
            store.resolve_conflict("ghost"),
            Err(Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn transactions_returns_unsynced_only() {
        let mut store = store_with_synced("srv-1");
        store.add_transaction("local-2", fields(-100), 3000).unwrap();
        store.add_transaction("local-3", fields(-200), 4000).unwrap();
        store.delete_transaction("local-3", 5000).unwrap(); // discarded

        let filter = TransactionFilter::default();
        let visible: Vec<_> = store
            .transactions(&filter)
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(visible, vec!["local-2".to_string()]);
    }

    #[test]
    fn transactions_filter_by_period_and_currency() {
        let mut store = Store::new("hh-1");
        store.add_transaction("local-1", fields(-100), 1000).unwrap();
        let mut eur = fields(-200);
        eur.currency = "EUR".into();
        eur.date = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        store.add_transaction("local-2", eur, 2000).unwrap();

        let august_usd = TransactionFilter {
            period: Some(Period::new(2026, 8)),
            currency: Some("USD".into()),
        };
        let visible = store.transactions(&august_usd);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "local-1");

        let july = TransactionFilter {
            period: Some(Period::new(2026, 7)),
            currency: None,
        };
        assert_eq!(store.transactions(&july).len(), 1);
    }

    #[test]
    fn tombstones_hidden_from_queries() {
        let mut store = store_with_synced("srv-1");
        store.delete_transaction("srv-1", 3000).unwrap();
        assert!(store
            .transactions(&TransactionFilter::default())
            .is_empty());
    }

    #[test]
    fn cache_roundtrip_and_staleness() {
        let mut store = Store::new("hh-1");
        let key = QueryKey::new("hh-1", Period::new(2026, 8), "USD");
        store.cache_query(&key, json!([{"total": -5000}]), 10_000);

        let max_age = Duration::from_secs(60);
        let fresh = store.cached_query(&key, 20_000, max_age).unwrap();
        assert!(!fresh.is_stale);
        assert_eq!(fresh.data, json!([{"total": -5000}]));

        let stale = store.cached_query(&key, 200_000, max_age).unwrap();
        assert!(stale.is_stale);

        let other = QueryKey::new("hh-1", Period::new(2026, 7), "USD");
        assert!(store.cached_query(&other, 20_000, max_age).is_none());
    }

    #[test]
    fn clear_all_wipes_every_collection() {
        let mut store = store_with_synced("srv-1");
        store.add_transaction("local-2", fields(-100), 3000).unwrap();
        let key = QueryKey::new("hh-1", Period::new(2026, 8), "USD");
        store.cache_query(&key, json!([]), 3000);

        store.clear_all();
        assert!(store.transaction("srv-1").is_none());
        assert_eq!(store.pending_sync_count(), 0);
        assert!(store
            .cached_query(&key, 3000, Duration::from_secs(60))
            .is_none());
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut store = store_with_synced("srv-1");
        store.add_transaction("local-2", fields(-100), 3000).unwrap();
        store
            .update_transaction("srv-1", amount_patch(-6000), 4000)
            .unwrap();
        let key = QueryKey::new("hh-1", Period::new(2026, 8), "USD");
        store.cache_query(&key, json!([{"total": -6100}]), 5000);

        let snapshot = store.export_state();
        assert_eq!(snapshot.record_count(), 2);
        assert_eq!(snapshot.pending_count(), 2);

        let restored = Store::from_snapshot(snapshot).unwrap();
        assert_eq!(restored.household_id(), "hh-1");
        assert_eq!(restored.pending_sync_count(), 2);
        assert_eq!(
            restored.transaction("srv-1").unwrap().fields.amount_minor,
            -6000
        );
        assert!(restored
            .cached_query(&key, 5000, Duration::from_secs(60))
            .is_some());
    }

    #[test]
    fn from_snapshot_rejects_invalid() {
        let mut snapshot = StoreSnapshot::new("hh-1");
        snapshot
            .queue
            .push(QueueItem::new("ghost", QueueOperation::Delete, 1000));
        assert!(Store::from_snapshot(snapshot).is_err());
    }
}
