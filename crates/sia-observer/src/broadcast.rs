//! Viewer membership and fan-out.
//!
//! Every connected viewer owns a bounded queue of encoded text frames.
//! [`Broadcaster::broadcast`] serializes an event once and offers the
//! frame to every queue without waiting: a full queue drops the frame
//! for that viewer only, and a closed queue means the session is gone so
//! the viewer is removed.

use std::collections::BTreeMap;

use axum::extract::ws::Utf8Bytes;
use sia_types::{ServerEvent, ViewerId};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// Fan-out hub for connected viewers.
#[derive(Debug)]
pub struct Broadcaster {
    viewers: RwLock<BTreeMap<ViewerId, mpsc::Sender<Utf8Bytes>>>,
    queue_capacity: usize,
}

impl Broadcaster {
    /// Create an empty broadcaster with `queue_capacity` frames per viewer.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            viewers: RwLock::new(BTreeMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a viewer. The returned receiver yields the frames to write.
    pub async fn register(&self) -> (ViewerId, mpsc::Receiver<Utf8Bytes>) {
        let id = ViewerId::new();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let count = {
            let mut viewers = self.viewers.write().await;
            viewers.insert(id, tx);
            viewers.len()
        };
        debug!(viewer = %id, viewers = count, "viewer registered");
        (id, rx)
    }

    /// Remove a viewer. Returns whether it was still registered.
    pub async fn unregister(&self, id: ViewerId) -> bool {
        let removed = self.viewers.write().await.remove(&id).is_some();
        if removed {
            debug!(viewer = %id, "viewer unregistered");
        }
        removed
    }

    /// Number of registered viewers.
    pub async fn viewer_count(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Offer `event` to every viewer.
    ///
    /// Returns how many viewers accepted the frame. With no viewers this
    /// is a no-op returning 0.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let mut closed = Vec::new();
        let delivered = {
            let viewers = self.viewers.read().await;
            if viewers.is_empty() {
                return 0;
            }
            let Some(frame) = encode(event) else {
                return 0;
            };

            let mut delivered = 0_usize;
            for (id, tx) in viewers.iter() {
                match tx.try_send(frame.clone()) {
                    Ok(()) => delivered = delivered.saturating_add(1),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(viewer = %id, event = event.name(), "viewer queue full, frame dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
            delivered
        };

        if !closed.is_empty() {
            let mut viewers = self.viewers.write().await;
            for id in &closed {
                viewers.remove(id);
                debug!(viewer = %id, "viewer queue closed, removed");
            }
        }
        delivered
    }

    /// Offer `event` to one viewer. Returns whether it was queued.
    pub async fn send_to(&self, id: ViewerId, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };
        let viewers = self.viewers.read().await;
        viewers
            .get(&id)
            .is_some_and(|tx| tx.try_send(frame).is_ok())
    }
}

/// Serialize an event into a text frame.
pub fn encode(event: &ServerEvent) -> Option<Utf8Bytes> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to encode event");
            None
        }
    }
}
