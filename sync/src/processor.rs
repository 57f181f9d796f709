//! The sync processor: drains the queue against the remote service.
//!
//! One drain walks the queue in FIFO order and dispatches each due item,
//! honoring the backoff schedule and the max-attempt cap. Remote failures
//! never escape: they become queue-item state plus events, and the
//! aggregate [`SyncSummary`] is the only return value.

use crate::{
    event::{SyncEvent, SyncSummary},
    remote::{NewRemoteTransaction, RemoteError},
    session::{now_ms, SyncSession},
};
use hearth_engine::{QueueItem, QueueOperation, RemoteRecord, Store, TransactionFields};
use std::sync::atomic::Ordering;

/// What became of one dispatched item.
enum ItemOutcome {
    Succeeded,
    Conflicted,
    Failed,
}

impl SyncSession {
    /// Drain the queue once.
    ///
    /// Returns immediately with an empty summary if a drain is already in
    /// progress. Never returns an error.
    pub async fn process_sync(&self) -> SyncSummary {
        if self.is_syncing.swap(true, Ordering::SeqCst) {
            tracing::debug!("drain already in progress, skipping");
            return SyncSummary::default();
        }

        self.emit(SyncEvent::Start);
        let mut summary = SyncSummary::default();

        let items = self.store.lock().await.queue_fifo();
        tracing::debug!(queued = items.len(), "drain started");

        let mut dispatched_any = false;
        for item in items {
            if !item.is_due(now_ms(), &self.config.backoff) {
                continue;
            }

            if item.attempts >= self.config.max_attempts {
                summary.processed += 1;
                summary.failed += 1;
                tracing::warn!(
                    transaction_id = %item.transaction_id,
                    attempts = item.attempts,
                    "item exceeded max attempts, caller must intervene"
                );
                self.emit(SyncEvent::MaxAttempts {
                    transaction_id: item.transaction_id.clone(),
                    attempts: item.attempts,
                });
                continue;
            }

            // Bound the remote call rate.
            if dispatched_any {
                tokio::time::sleep(self.config.throttle).await;
            }
            dispatched_any = true;

            summary.processed += 1;
            match self.dispatch(&item).await {
                ItemOutcome::Succeeded => summary.succeeded += 1,
                ItemOutcome::Conflicted => summary.conflicts += 1,
                ItemOutcome::Failed => summary.failed += 1,
            }
        }

        self.is_syncing.store(false, Ordering::SeqCst);
        tracing::info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            conflicts = summary.conflicts,
            "drain complete"
        );
        self.emit(SyncEvent::Complete(summary));
        summary
    }

    async fn dispatch(&self, item: &QueueItem) -> ItemOutcome {
        match &item.operation {
            QueueOperation::Create { fields } => self.dispatch_create(item, fields).await,
            QueueOperation::Update { .. } => self.dispatch_update(item).await,
            QueueOperation::Delete => self.dispatch_delete(item).await,
        }
    }

    async fn dispatch_create(
        &self,
        item: &QueueItem,
        fields: &TransactionFields,
    ) -> ItemOutcome {
        let new = NewRemoteTransaction {
            household_id: self.household_id.clone(),
            fields: fields.clone(),
        };

        match self.remote.insert_transaction(new).await {
            Ok(row) => {
                let remote_id = row.id.clone();
                {
                    let mut store = self.store.lock().await;
                    if let Err(error) = store.mark_synced(&item.transaction_id, row) {
                        tracing::warn!(
                            transaction_id = %item.transaction_id,
                            %error,
                            "record vanished before sync confirmation"
                        );
                    }
                    store.remove_queue_item(&item.transaction_id);
                    self.persist_quiet(&store).await;
                }
                tracing::debug!(
                    transaction_id = %remote_id,
                    previous_id = %item.transaction_id,
                    "create confirmed"
                );
                self.emit(SyncEvent::Synced {
                    transaction_id: remote_id,
                    previous_id: Some(item.transaction_id.clone()),
                });
                ItemOutcome::Succeeded
            }
            Err(error) => self.note_failure(item, &error).await,
        }
    }

    async fn dispatch_update(&self, item: &QueueItem) -> ItemOutcome {
        // Fetch the current remote row first; not-found always wins over
        // conflict detection.
        let row = match self.remote.fetch_transaction(&item.transaction_id).await {
            Ok(row) => row,
            Err(error) if error.is_not_found() => {
                self.discard_moot(item).await;
                return ItemOutcome::Succeeded;
            }
            Err(error) => return self.note_failure(item, &error).await,
        };
        if row.deleted {
            self.discard_moot(item).await;
            return ItemOutcome::Succeeded;
        }

        let local = {
            let store = self.store.lock().await;
            store
                .record(&item.transaction_id)
                .map(|record| (record.fields.clone(), record.server_version))
        };
        let Some((local_fields, server_version)) = local else {
            tracing::warn!(
                transaction_id = %item.transaction_id,
                "queue entry without record, dropping"
            );
            self.remove_item_quiet(item).await;
            return ItemOutcome::Succeeded;
        };

        if server_version != Some(row.updated_at) {
            return self.surface_conflict(item, local_fields, row).await;
        }

        match self
            .remote
            .update_transaction(&item.transaction_id, local_fields)
            .await
        {
            Ok(row) => {
                {
                    let mut store = self.store.lock().await;
                    if let Err(error) = store.mark_synced(&item.transaction_id, row) {
                        tracing::warn!(
                            transaction_id = %item.transaction_id,
                            %error,
                            "record vanished before sync confirmation"
                        );
                    }
                    store.remove_queue_item(&item.transaction_id);
                    self.persist_quiet(&store).await;
                }
                tracing::debug!(transaction_id = %item.transaction_id, "update confirmed");
                self.emit(SyncEvent::Synced {
                    transaction_id: item.transaction_id.clone(),
                    previous_id: None,
                });
                ItemOutcome::Succeeded
            }
            Err(error) => self.note_failure(item, &error).await,
        }
    }

    async fn dispatch_delete(&self, item: &QueueItem) -> ItemOutcome {
        match self.remote.soft_delete_transaction(&item.transaction_id).await {
            // Already deleted remotely counts as success.
            Ok(()) | Err(RemoteError::NotFound(_)) => {
                {
                    let mut store = self.store.lock().await;
                    store.remove_transaction(&item.transaction_id);
                    store.remove_queue_item(&item.transaction_id);
                    self.persist_quiet(&store).await;
                }
                tracing::debug!(transaction_id = %item.transaction_id, "delete confirmed");
                self.emit(SyncEvent::Synced {
                    transaction_id: item.transaction_id.clone(),
                    previous_id: None,
                });
                ItemOutcome::Succeeded
            }
            Err(error) => self.note_failure(item, &error).await,
        }
    }

    /// Conflicts are surfaced, never retried: freeze the record with the
    /// remote row and drop the queue entry.
    async fn surface_conflict(
        &self,
        item: &QueueItem,
        local_fields: TransactionFields,
        row: RemoteRecord,
    ) -> ItemOutcome {
        {
            let mut store = self.store.lock().await;
            if let Err(error) = store.mark_conflict(&item.transaction_id, row.clone()) {
                tracing::warn!(
                    transaction_id = %item.transaction_id,
                    %error,
                    "record vanished before conflict could be recorded"
                );
            }
            store.remove_queue_item(&item.transaction_id);
            self.persist_quiet(&store).await;
        }
        tracing::warn!(
            transaction_id = %item.transaction_id,
            remote_stamp = row.updated_at,
            "concurrent remote edit detected"
        );
        self.emit(SyncEvent::Conflict {
            transaction_id: item.transaction_id.clone(),
            local: local_fields,
            remote: row,
        });
        ItemOutcome::Conflicted
    }

    /// The remote side already reflects the terminal state: drop the queue
    /// entry and the now-meaningless local record, with no event noise.
    async fn discard_moot(&self, item: &QueueItem) {
        let mut store = self.store.lock().await;
        store.remove_queue_item(&item.transaction_id);
        store.remove_transaction(&item.transaction_id);
        self.persist_quiet(&store).await;
        tracing::debug!(
            transaction_id = %item.transaction_id,
            operation = item.operation.kind(),
            "remote already reflects terminal state, dropping moot operation"
        );
    }

    async fn remove_item_quiet(&self, item: &QueueItem) {
        let mut store = self.store.lock().await;
        store.remove_queue_item(&item.transaction_id);
        self.persist_quiet(&store).await;
    }

    async fn note_failure(&self, item: &QueueItem, error: &RemoteError) -> ItemOutcome {
        let attempts = item.attempts + 1;
        {
            let mut store = self.store.lock().await;
            store.record_attempt(&item.transaction_id, now_ms(), error.to_string());
            self.persist_quiet(&store).await;
        }
        tracing::warn!(
            transaction_id = %item.transaction_id,
            operation = item.operation.kind(),
            attempts,
            %error,
            "sync attempt failed, item stays queued"
        );
        self.emit(SyncEvent::Error {
            transaction_id: item.transaction_id.clone(),
            attempts,
            message: error.to_string(),
        });
        ItemOutcome::Failed
    }

    /// Persistence failures mid-drain must not abort the drain; in-memory
    /// state stays authoritative and the next successful save catches up.
    async fn persist_quiet(&self, store: &Store) {
        if let Err(error) = self.storage.save(&store.export_state()).await {
            tracing::error!(%error, "failed to persist snapshot during drain");
        }
    }
}
