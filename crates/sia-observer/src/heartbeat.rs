//! Periodic liveness pings to every viewer.

use std::sync::Arc;
use std::time::Duration;

use sia_types::ServerEvent;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::state::AppState;

/// Broadcast a `heartbeat` every `period` until shutdown.
///
/// The first heartbeat goes out one period after start. Heartbeats do
/// not touch the snapshot.
pub async fn run_heartbeat(state: Arc<AppState>, period: Duration) {
    let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = state.shutdown.wait() => break,
            _ = interval.tick() => {
                let viewers = state.broadcaster.broadcast(&ServerEvent::heartbeat_now()).await;
                trace!(viewers, "heartbeat sent");
            }
        }
    }
    debug!("heartbeat task stopped");
}
