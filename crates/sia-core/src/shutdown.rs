//! Process-wide shutdown signal.
//!
//! One [`Shutdown`] is created at startup and cloned into every long-lived
//! task. Requesting shutdown is idempotent and wakes every waiter,
//! including ones that start waiting after the request.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable, latching shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// A signal that has not been requested yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Every current and future waiter is released.
    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until shutdown is requested.
    ///
    /// Returns immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
