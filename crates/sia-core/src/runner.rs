//! The periodic poll loop.
//!
//! [`run_poll_loop`] drives [`SourcePoller::poll_cycle`] on a fixed
//! period, commits each outcome to the [`SnapshotStore`] as one unit, and
//! hands a [`CycleReport`] to a [`PollCallback`] so the dashboard can
//! broadcast the new snapshot.
//!
//! Cycles are strictly sequential. A cycle that overruns the period delays
//! the next one rather than overlapping it, and missed ticks are skipped
//! instead of bursting. Shutdown is only observed between cycles, so an
//! in-flight cycle always completes and commits.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

use crate::poller::SourcePoller;
use crate::shutdown::Shutdown;
use crate::store::{MergeReport, SnapshotStore};

/// What happened in one committed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Whether the values came from the real sources.
    pub live: bool,
    /// Result of merging the cycle's update.
    pub merge: MergeReport,
}

/// Callback invoked after a cycle changed the snapshot.
pub trait PollCallback: Send {
    /// Called once per cycle that wrote at least one field.
    fn on_cycle(&mut self, report: &CycleReport) -> impl Future<Output = ()> + Send;
}

/// A callback that does nothing. Useful for tests and headless runs.
pub struct NoOpCallback;

impl PollCallback for NoOpCallback {
    async fn on_cycle(&mut self, _report: &CycleReport) {}
}

/// Counters for a finished poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollLoopSummary {
    /// Total cycles run.
    pub cycles: u64,
    /// Cycles that committed live values.
    pub live: u64,
    /// Cycles that fell back to synthetic values.
    pub synthetic: u64,
}

impl PollLoopSummary {
    fn record(&mut self, live: bool) {
        self.cycles = self.cycles.saturating_add(1);
        if live {
            self.live = self.live.saturating_add(1);
        } else {
            self.synthetic = self.synthetic.saturating_add(1);
        }
    }
}

/// Poll on `period` until `shutdown` is requested.
///
/// The first cycle runs immediately.
pub async fn run_poll_loop<C: PollCallback>(
    poller: &mut SourcePoller,
    store: &SnapshotStore,
    callback: &mut C,
    shutdown: &Shutdown,
    period: Duration,
) -> PollLoopSummary {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut summary = PollLoopSummary::default();

    info!(
        ?period,
        pumps = poller.sources().pumps.len(),
        solars = poller.sources().solars.len(),
        "Poll loop starting"
    );

    loop {
        tokio::select! {
            biased;
            () = shutdown.wait() => break,
            _ = interval.tick() => {}
        }

        let outcome = poller.poll_cycle().await;
        let live = outcome.is_live();
        let merge = store.apply(outcome.update()).await;
        summary.record(live);

        trace!(cycle = summary.cycles, live, applied = merge.applied.len(), "cycle committed");

        if merge.changed() {
            let report = CycleReport {
                cycle: summary.cycles,
                live,
                merge,
            };
            callback.on_cycle(&report).await;
        }
    }

    info!(
        cycles = summary.cycles,
        live = summary.live,
        synthetic = summary.synthetic,
        "Poll loop stopped"
    );
    summary
}
