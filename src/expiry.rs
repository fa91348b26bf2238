//! One-shot auto-logout timer for the lifetime of a protected view.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::SessionContext;

/// Handle to a pending auto-logout. Dropping it cancels the timer.
#[derive(Debug)]
pub struct ExpiryTimer {
    task: JoinHandle<()>,
}

impl ExpiryTimer {
    /// Arm a timer that ends the session at its expiry watermark.
    ///
    /// Returns `None` when there is no active session or it carries no
    /// watermark. When the timer fires the store is cleared and `on_expire`
    /// runs, typically to navigate to sign-in. A refresh that lands while the
    /// timer waits moves the deadline out; a session already signed out when
    /// the wait ends leaves `on_expire` uncalled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(session: SessionContext, on_expire: F) -> Option<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        if !session.is_session_active() {
            return None;
        }
        let initial = session.ms_until_expiry()?;
        tracing::debug!(remaining_ms = initial, "arming expiry timer");

        let task = tokio::spawn(async move {
            let mut remaining = initial;
            while remaining > 0 {
                tokio::time::sleep(Duration::from_millis(remaining.unsigned_abs())).await;
                let Some(left) = session.ms_until_expiry() else {
                    tracing::debug!("session ended before its expiry watermark; timer idle");
                    return;
                };
                remaining = left;
            }
            tracing::info!("session reached its expiry watermark; signing out");
            session.store().clear();
            on_expire();
        });
        Some(Self { task })
    }

    /// True once the timer has fired or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
