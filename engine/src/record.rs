//! Offline record types.
//!
//! One [`OfflineRecord`] exists per transaction known to the client. Records
//! move between sync states as the processor reconciles them with the remote
//! service; a record in conflict is frozen until explicitly resolved.

use crate::{HouseholdId, RecordId, Timestamp, TransactionFields};
use serde::{Deserialize, Serialize};

/// Synchronization state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local edits not yet confirmed by the remote service
    Pending,
    /// Remote service reflects this record
    Synced,
    /// Concurrent remote edit detected; frozen until resolved
    Conflict,
}

/// The remote service's row for a transaction, as seen by this client.
///
/// `updated_at` is the last-writer version stamp the remote service assigns
/// on every write; comparing it against [`OfflineRecord::server_version`] is
/// how conflicts are detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: RecordId,
    pub household_id: HouseholdId,
    pub fields: TransactionFields,
    /// Last-writer version stamp (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// Remote soft-delete flag
    pub deleted: bool,
}

/// A transaction record held locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRecord {
    /// Client-generated (`local-` prefixed) until the remote service assigns
    /// its own id, at which point the record is re-keyed
    pub id: RecordId,
    pub fields: TransactionFields,
    pub sync_status: SyncStatus,
    /// Incremented on every local mutation
    pub local_version: u64,
    /// Remote version stamp recorded at last sync, `None` until first sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<Timestamp>,
    /// Remote row fetched at conflict-detection time; present only while
    /// `sync_status` is `Conflict`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_snapshot: Option<RemoteRecord>,
    /// Set only for records never yet synced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_created_at: Option<Timestamp>,
    /// Local tombstone for a pending remote delete
    #[serde(default)]
    pub deleted: bool,
}

impl OfflineRecord {
    /// Create a record for a transaction added while offline.
    pub fn new_local(
        id: impl Into<RecordId>,
        fields: TransactionFields,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            fields,
            sync_status: SyncStatus::Pending,
            local_version: 1,
            server_version: None,
            server_snapshot: None,
            offline_created_at: Some(now),
            deleted: false,
        }
    }

    /// Check if the record is active (not tombstoned).
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Check if the record has never been confirmed by the remote service.
    pub fn never_synced(&self) -> bool {
        self.server_version.is_none()
    }

    /// Absorb a confirmed remote row: the remote service is now
    /// authoritative for the fields and the version stamp.
    ///
    /// Does not touch `id`; re-keying is the store's job.
    pub fn apply_remote(&mut self, remote: RemoteRecord) {
        self.fields = remote.fields;
        self.sync_status = SyncStatus::Synced;
        self.server_version = Some(remote.updated_at);
        self.server_snapshot = None;
        self.offline_created_at = None;
        self.deleted = false;
    }

    /// Enter conflict state, keeping the remote row for later resolution.
    pub fn mark_conflict(&mut self, remote: RemoteRecord) {
        self.sync_status = SyncStatus::Conflict;
        self.server_snapshot = Some(remote);
    }

    /// Accept the stored server snapshot as authoritative.
    ///
    /// Returns `false` if the record is not in conflict (no-op), which is
    /// what makes resolution idempotent.
    pub fn resolve_with_server(&mut self) -> bool {
        if self.sync_status != SyncStatus::Conflict {
            return false;
        }
        // Invariant: a conflict record always carries its snapshot.
        let Some(remote) = self.server_snapshot.take() else {
            return false;
        };
        self.local_version += 1;
        self.apply_remote(remote);
        true
    }
}
