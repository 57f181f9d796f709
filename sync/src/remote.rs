//! The remote record service seam.
//!
//! The remote service is an external collaborator: a generic per-table
//! insert/update/fetch plus an idempotent soft-delete procedure. Every
//! written row comes back with its last-writer `updated_at` stamp, and "not
//! found" is a distinguishable error code used to detect moot operations.

use async_trait::async_trait;
use hearth_engine::{HouseholdId, RecordId, RemoteRecord, TransactionFields};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the remote record service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The record does not exist remotely
    #[error("remote record not found: {0}")]
    NotFound(RecordId),

    /// Network or transport failure; the operation may be retried
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

/// Row sent to the remote insert call.
///
/// Local-only sync metadata (status, versions, offline timestamps) never
/// leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRemoteTransaction {
    pub household_id: HouseholdId,
    pub fields: TransactionFields,
}

/// The remote record service consumed by the sync processor.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Insert a new transaction. The returned row carries the id assigned
    /// by the service and its version stamp.
    async fn insert_transaction(
        &self,
        new: NewRemoteTransaction,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Fetch the current remote row for a transaction.
    async fn fetch_transaction(&self, id: &str) -> Result<RemoteRecord, RemoteError>;

    /// Replace a transaction's fields. The returned row carries the new
    /// version stamp.
    async fn update_transaction(
        &self,
        id: &str,
        fields: TransactionFields,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Idempotent soft delete.
    async fn soft_delete_transaction(&self, id: &str) -> Result<(), RemoteError>;
}

/// Device connectivity probe, consulted before a scheduled drain fires.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Always-online probe for environments without a platform signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
