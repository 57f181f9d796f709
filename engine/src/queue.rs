//! Sync queue: pending mutations and the coalescing discipline.
//!
//! The queue holds at most one item per transaction. Appending an operation
//! for a transaction that already has an item coalesces the two, so the net
//! effect of a rapid burst of local edits is exactly one remote call:
//!
//! | existing | new    | result                          |
//! |----------|--------|---------------------------------|
//! | create   | update | create, patch applied to fields |
//! | create   | delete | entry removed entirely          |
//! | update   | update | update, patches merged          |
//! | update   | delete | delete                          |
//! | delete   | *      | delete (terminal)               |

use crate::{RecordId, Timestamp, TransactionFields, TransactionPatch};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A pending mutation, one variant per remote call shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueOperation {
    Create { fields: TransactionFields },
    Update { patch: TransactionPatch },
    Delete,
}

/// Outcome of coalescing an incoming operation into an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coalesced {
    /// Replace the entry's operation with this one
    Keep(QueueOperation),
    /// Drop the entry entirely
    Remove,
}

impl QueueOperation {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueOperation::Create { .. } => "create",
            QueueOperation::Update { .. } => "update",
            QueueOperation::Delete => "delete",
        }
    }

    /// Coalesce an incoming operation into this one.
    pub fn coalesce(self, incoming: QueueOperation) -> Coalesced {
        match (self, incoming) {
            // The record never existed remotely, so nothing to tell it.
            (QueueOperation::Create { .. }, QueueOperation::Delete) => Coalesced::Remove,

            (QueueOperation::Create { fields }, QueueOperation::Update { patch }) => {
                Coalesced::Keep(QueueOperation::Create {
                    fields: fields.with_patch(&patch),
                })
            }
            (QueueOperation::Update { patch }, QueueOperation::Update { patch: later }) => {
                Coalesced::Keep(QueueOperation::Update {
                    patch: patch.merge(later),
                })
            }
            (QueueOperation::Update { .. }, QueueOperation::Delete) => {
                Coalesced::Keep(QueueOperation::Delete)
            }

            // Delete is terminal; later operations on a deleted id are dropped.
            (QueueOperation::Delete, _) => Coalesced::Keep(QueueOperation::Delete),

            // A create for an id that is already queued is a caller bug; the
            // store never produces it. Keep the existing entry.
            (existing, QueueOperation::Create { .. }) => Coalesced::Keep(existing),
        }
    }
}

/// Fixed retry delay table indexed by attempt count; the last slot repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    slots: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(slots: Vec<Duration>) -> Self {
        Self { slots }
    }

    /// Delay before retrying an item that has failed `attempts` times.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if attempts == 0 || self.slots.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempts as usize).min(self.slots.len() - 1);
        self.slots[index]
    }
}

impl Default for BackoffSchedule {
    /// Immediate, 5s, 30s, 5m, then 15m repeating.
    fn default() -> Self {
        Self::new(vec![
            Duration::ZERO,
            Duration::from_secs(5),
            Duration::from_secs(30),
            Duration::from_secs(5 * 60),
            Duration::from_secs(15 * 60),
        ])
    }
}

/// One queued mutation for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub transaction_id: RecordId,
    pub operation: QueueOperation,
    pub created_at: Timestamp,
    /// Failed dispatch count
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueItem {
    pub fn new(
        transaction_id: impl Into<RecordId>,
        operation: QueueOperation,
        now: Timestamp,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            operation,
            created_at: now,
            attempts: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    /// Record a failed dispatch.
    pub fn record_attempt(&mut self, now: Timestamp, error: impl Into<String>) {
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.last_error = Some(error.into());
    }

    /// Check whether the item may be dispatched at `now` under the backoff
    /// schedule. An item that has never failed is always due.
    pub fn is_due(&self, now: Timestamp, backoff: &BackoffSchedule) -> bool {
        if self.attempts == 0 {
            return true;
        }
        let delay = backoff.delay_for(self.attempts).as_millis() as Timestamp;
        match self.last_attempt_at {
            Some(last) => now >= last.saturating_add(delay),
            None => true,
        }
    }
}

/// Ordered log of pending mutations, at most one per transaction.
#[derive(Debug, Clone, Default)]
pub struct SyncQueue {
    items: Vec<QueueItem>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the queued item for a transaction, if any.
    pub fn get(&self, transaction_id: &str) -> Option<&QueueItem> {
        self.items
            .iter()
            .find(|item| item.transaction_id == transaction_id)
    }

    /// Append an operation, coalescing with any existing entry.
    ///
    /// A coalesced entry keeps its queue position and attempt bookkeeping;
    /// only the payload changes.
    pub fn push(
        &mut self,
        transaction_id: impl Into<RecordId>,
        operation: QueueOperation,
        now: Timestamp,
    ) {
        let transaction_id = transaction_id.into();
        let existing = self
            .items
            .iter()
            .position(|item| item.transaction_id == transaction_id);

        match existing {
            Some(index) => {
                let current = self.items[index].operation.clone();
                match current.coalesce(operation) {
                    Coalesced::Keep(merged) => self.items[index].operation = merged,
                    Coalesced::Remove => {
                        self.items.remove(index);
                    }
                }
            }
            None => self
                .items
                .push(QueueItem::new(transaction_id, operation, now)),
        }
    }

    /// Remove the entry for a transaction.
    pub fn remove(&mut self, transaction_id: &str) -> Option<QueueItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.transaction_id == transaction_id)?;
        Some(self.items.remove(index))
    }

    /// Record a failed dispatch on an entry. Returns `false` if no entry
    /// exists for the transaction.
    pub fn record_attempt(
        &mut self,
        transaction_id: &str,
        now: Timestamp,
        error: impl Into<String>,
    ) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| item.transaction_id == transaction_id)
        {
            Some(item) => {
                item.record_attempt(now, error);
                true
            }
            None => false,
        }
    }

    /// Iterate entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// Clone the queue contents in FIFO order by `created_at`.
    pub fn to_fifo_vec(&self) -> Vec<QueueItem> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        items
    }

    /// Rebuild from persisted items (snapshot import).
    pub(crate) fn from_items(items: Vec<QueueItem>) -> Self {
        Self { items }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
