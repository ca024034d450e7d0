//! Typed notification channel for fallback events.
//!
//! When a resource gives up on the network and switches to bundled
//! content, a `FallbackNotice` is broadcast so decoupled consumers (a
//! toast, a status line) can react without holding a reference to the
//! loader that failed. Sends are fire-and-forget: a bus with no live
//! subscribers simply drops the notice.

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notices per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 16;

/// A resource has entered fallback mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    /// The resource key that fell back, e.g. `"projects"`.
    pub resource: String,
}

/// Broadcast bus carrying fallback notices to any number of subscribers.
pub struct NotificationBus {
    tx: broadcast::Sender<FallbackNotice>,
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FallbackNotice> {
        self.tx.subscribe()
    }

    pub fn notify_fallback(&self, resource: &str) {
        debug!(resource, "Dispatching fallback notification");
        let _ = self.tx.send(FallbackNotice {
            resource: resource.to_string(),
        });
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
