//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory [`Store`](crate::Store)
//! and durable storage. They use `BTreeMap` for deterministic serialization
//! order, so the same state always produces the same document.

use crate::{
    error::Result, CacheEntry, Error, HouseholdId, OfflineRecord, QueueItem, RecordId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the three durable collections: records,
/// queue, and cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub format_version: u32,
    pub household_id: HouseholdId,
    pub records: BTreeMap<RecordId, OfflineRecord>,
    pub queue: Vec<QueueItem>,
    pub cache: BTreeMap<String, CacheEntry>,
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new(household_id: impl Into<HouseholdId>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            household_id: household_id.into(),
            records: BTreeMap::new(),
            queue: Vec::new(),
            cache: BTreeMap::new(),
        }
    }

    pub fn add_record(&mut self, record: OfflineRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Validate internal invariants.
    pub fn validate(&self) -> Result<()> {
        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersionMismatch {
                supported: SNAPSHOT_FORMAT_VERSION,
                actual: self.format_version,
            });
        }

        // At most one queue item per transaction, and each item must point
        // at a known record.
        let mut seen: HashSet<&str> = HashSet::new();
        for item in &self.queue {
            if !seen.insert(&item.transaction_id) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate queue entry for transaction '{}'",
                    item.transaction_id
                )));
            }
            if !self.records.contains_key(&item.transaction_id) {
                return Err(Error::InvalidSnapshot(format!(
                    "queue entry for unknown transaction '{}'",
                    item.transaction_id
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Summary without the full data.
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: self.format_version,
            household_id: self.household_id.clone(),
            record_count: self.records.len(),
            pending_count: self.queue.len(),
            cache_count: self.cache.len(),
        }
    }
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub household_id: HouseholdId,
    pub record_count: usize,
    pub pending_count: usize,
    pub cache_count: usize,
}
