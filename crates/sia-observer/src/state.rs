//! Shared application state for the dashboard server.
//!
//! [`AppState`] ties the snapshot store to the viewer broadcaster. Every
//! path that changes the snapshot (a poll cycle or a viewer command)
//! ends in [`AppState::publish_snapshot`], which reads the current view
//! and fans it out.
//!
//! Every path that reads a view and queues it (publish, attach, a single
//! viewer's `request_data`) holds one mutex, so frames in any viewer's
//! queue never go back in time.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use sia_core::shutdown::Shutdown;
use sia_core::store::SnapshotStore;
use sia_types::{PumpMode, ServerEvent, SetPumpState, SnapshotView, ViewerId};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::error::ObserverError;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// The process-wide snapshot.
    pub store: Arc<SnapshotStore>,
    /// Connected viewers.
    pub broadcaster: Broadcaster,
    /// Process shutdown signal.
    pub shutdown: Shutdown,
    publish: Mutex<()>,
}

impl AppState {
    /// Create state over an existing store.
    pub fn new(store: Arc<SnapshotStore>, shutdown: Shutdown, viewer_queue_capacity: usize) -> Self {
        Self {
            store,
            broadcaster: Broadcaster::new(viewer_queue_capacity),
            shutdown,
            publish: Mutex::new(()),
        }
    }

    /// Push the current snapshot to every viewer.
    ///
    /// Returns the number of viewers that accepted it.
    pub async fn publish_snapshot(&self) -> usize {
        let _guard = self.publish.lock().await;
        let view = self.store.to_view().await;
        self.broadcaster
            .broadcast(&ServerEvent::data_update(view))
            .await
    }

    /// Send the current snapshot to one viewer only.
    ///
    /// Returns `false` if the viewer is gone or its queue is full.
    pub async fn send_snapshot_to(&self, id: ViewerId) -> bool {
        let _guard = self.publish.lock().await;
        let view = self.store.to_view().await;
        self.broadcaster
            .send_to(id, &ServerEvent::data_update(view))
            .await
    }

    /// Register a viewer and capture the snapshot it should see first.
    pub async fn attach_viewer(&self) -> (ViewerId, mpsc::Receiver<Utf8Bytes>, SnapshotView) {
        let _guard = self.publish.lock().await;
        let (id, rx) = self.broadcaster.register().await;
        let view = self.store.to_view().await;
        (id, rx, view)
    }

    /// Apply a `set_pump_state` command and re-broadcast.
    ///
    /// The requested state must be a known pump mode.
    pub async fn apply_pump_command(&self, command: &SetPumpState) -> Result<usize, ObserverError> {
        let mode: PumpMode = command
            .state
            .parse()
            .map_err(ObserverError::InvalidCommand)?;
        let group = command.pump.group();

        let report = self.store.set_pump_state(group, mode.as_str()).await;
        debug!(pump = %group, applied = report.applied.len(), "pump command merged");
        info!(pump = %group, state = %mode, "Pump state changed by viewer");

        Ok(self.publish_snapshot().await)
    }
}
