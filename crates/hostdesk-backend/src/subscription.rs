//! Cancellable session-change subscription.
//!
//! Backends push session changes (sign-in on another tab, token refresh,
//! server-side sign-out) as discrete messages. A [`SessionSubscription`]
//! is the receiving end: one handle per listener, unsubscribed explicitly
//! with [`unsubscribe`](SessionSubscription::unsubscribe) or implicitly on
//! drop.

use tokio::sync::broadcast;
use tracing::warn;

use crate::SessionChange;

/// Receiving end of a backend's session-change feed.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: Option<broadcast::Receiver<SessionChange>>,
}

impl SessionSubscription {
    /// Wraps a broadcast receiver. Backends create one per
    /// `on_session_change` call.
    pub fn new(rx: broadcast::Receiver<SessionChange>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A subscription that never delivers anything. For backends without
    /// push notifications.
    pub fn closed() -> Self {
        Self { rx: None }
    }

    /// Waits for the next change.
    ///
    /// Returns `None` once the subscription is cancelled or the backend
    /// dropped its sender. If the listener fell behind, the missed
    /// messages are skipped: only the most recent session matters to a
    /// classifier.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session listener lagged, skipping stale events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Stops receiving. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }

    /// Whether this handle is still registered.
    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}
