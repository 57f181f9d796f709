//! Debounced drain scheduling.
//!
//! Every local edit re-arms a single debounce timer, so a burst of edits
//! triggers one drain shortly after the burst ends. The timer only fires
//! into a drain while the connectivity probe reports online; an in-progress
//! drain is never affected by scheduling or cancellation.

use crate::session::SyncSession;

impl SyncSession {
    /// Schedule a drain after the debounce window, replacing any pending
    /// timer.
    pub async fn schedule_sync(&self) {
        // The session is kept alive by the timer task; a session already
        // being torn down schedules nothing.
        let Some(session) = self.weak.upgrade() else {
            return;
        };

        let delay = self.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !session.connectivity.is_online() {
                tracing::debug!("skipping scheduled drain: offline");
                return;
            }
            session.process_sync().await;
        });

        let mut slot = self.scheduled.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel a pending scheduled drain, if any. Does not affect a drain
    /// already in progress.
    pub async fn cancel_scheduled_sync(&self) {
        if let Some(handle) = self.scheduled.lock().await.take() {
            handle.abort();
            tracing::debug!("cancelled scheduled drain");
        }
    }

    /// Connectivity-regained hook: re-arm the debounce timer.
    pub async fn notify_online(&self) {
        tracing::debug!("connectivity regained");
        self.schedule_sync().await;
    }
}
