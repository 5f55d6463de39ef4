//! Poll callback that pushes each committed cycle to the dashboard.

use std::sync::Arc;

use sia_core::runner::{CycleReport, PollCallback};
use sia_observer::state::AppState;
use tracing::trace;

/// Bridges the poll loop to the viewer broadcaster.
pub struct DashboardCallback {
    state: Arc<AppState>,
}

impl DashboardCallback {
    /// Create a callback publishing through `state`.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl PollCallback for DashboardCallback {
    async fn on_cycle(&mut self, report: &CycleReport) {
        let viewers = self.state.publish_snapshot().await;
        trace!(cycle = report.cycle, live = report.live, viewers, "Snapshot published");
    }
}
