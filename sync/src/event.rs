//! Sync events pushed to UI collaborators.
//!
//! Events are a typed enum delivered over a `tokio::sync::broadcast`
//! channel; subscribers drive pending-count badges and conflict prompts
//! from them.

use hearth_engine::{RecordId, RemoteRecord, TransactionFields};
use serde::{Deserialize, Serialize};

/// Aggregate counts for one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Items dispatched this drain (not-yet-due items are not counted)
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub conflicts: usize,
}

/// Events emitted by the sync processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A drain began
    Start,
    /// A queue item was confirmed by the remote service
    Synced {
        transaction_id: RecordId,
        /// The client-generated id this record had before the remote
        /// service assigned its own
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_id: Option<RecordId>,
    },
    /// A transport failure; the item stays queued for the next drain
    Error {
        transaction_id: RecordId,
        attempts: u32,
        message: String,
    },
    /// Concurrent remote edit detected; the record is frozen until resolved
    Conflict {
        transaction_id: RecordId,
        local: TransactionFields,
        remote: RemoteRecord,
    },
    /// An item exhausted its retry budget and needs caller intervention
    MaxAttempts {
        transaction_id: RecordId,
        attempts: u32,
    },
    /// The drain finished
    Complete(SyncSummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tags() {
        let json = serde_json::to_string(&SyncEvent::Start).unwrap();
        assert_eq!(json, "{\"type\":\"start\"}");

        let json = serde_json::to_string(&SyncEvent::MaxAttempts {
            transaction_id: "t-1".into(),
            attempts: 5,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"max_attempts\""));

        let json = serde_json::to_string(&SyncEvent::Complete(SyncSummary {
            processed: 2,
            succeeded: 1,
            failed: 1,
            conflicts: 0,
        }))
        .unwrap();
        assert!(json.contains("\"type\":\"complete\""));
        assert!(json.contains("\"processed\":2"));
    }

    #[test]
    fn synced_omits_absent_previous_id() {
        let json = serde_json::to_string(&SyncEvent::Synced {
            transaction_id: "srv-1".into(),
            previous_id: None,
        })
        .unwrap();
        assert!(!json.contains("previousId"));
    }
}
