//! Integration tests for source polling and the poll loop.
//!
//! Sources are served by a [`FixedTagReader`], so every test runs without
//! a tag API. Time-dependent tests run on a paused clock.

#![allow(clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use sia_core::config::{SiaConfig, SourcesConfig};
use sia_core::poller::{PollError, PollOutcome, SourcePoller};
use sia_core::runner::{CycleReport, NoOpCallback, PollCallback, run_poll_loop};
use sia_core::shutdown::Shutdown;
use sia_core::store::SnapshotStore;
use sia_core::synthetic::bands;
use sia_core::tags::{FixedTagReader, TagReader};
use sia_types::{GroupKind, Reading, SnapshotUpdate};

const TIMEOUT: Duration = Duration::from_millis(150);

fn sources(pumps: &[&str], solars: &[&str]) -> SourcesConfig {
    SourcesConfig {
        pumps: pumps.iter().map(|s| (*s).to_owned()).collect(),
        solars: solars.iter().map(|s| (*s).to_owned()).collect(),
        tank: Some(String::from("tank")),
        skid: Some(String::from("skid")),
        control: Some(String::from("control")),
        ..SourcesConfig::default()
    }
}

fn with_pump(
    reader: FixedTagReader,
    app: &str,
    target: f64,
    flow: f64,
    state: &str,
) -> FixedTagReader {
    reader
        .with_tag(app, "target_rate", target)
        .with_tag(app, "flow_rate", flow)
        .with_tag(app, "pump_state", state)
}

fn with_solar(reader: FixedTagReader, app: &str, pct: f64, ah: f64) -> FixedTagReader {
    reader
        .with_tag(app, "battery_voltage", 24.0)
        .with_tag(app, "battery_percentage", pct)
        .with_tag(app, "panel_power", 30.0)
        .with_tag(app, "battery_ah", ah)
}

/// A site with two pumps, two solar controllers, a tank, a skid and a
/// control application reporting `on`.
fn full_site() -> FixedTagReader {
    let reader = with_pump(FixedTagReader::new(), "pump-a", 15.0, 14.2, "auto");
    let reader = with_pump(reader, "pump-b", 12.0, 11.8, "standby");
    let reader = with_solar(reader, "solar-1", 70.0, 40.0);
    let reader = with_solar(reader, "solar-2", 80.0, 60.0);
    reader
        .with_tag("tank", "tank_level_mm", 820.0)
        .with_tag("tank", "tank_level_percent", "41")
        .with_tag("skid", "skid_flow", 12.5)
        .with_tag("skid", "skid_pressure", 3.4)
        .with_tag("control", "state", "on")
}

fn poller(reader: FixedTagReader, sources: SourcesConfig) -> SourcePoller {
    SourcePoller::new(TagReader::Fixed(reader), sources, TIMEOUT)
        .with_rng(StdRng::seed_from_u64(42))
}

fn field<'a>(update: &'a SnapshotUpdate, group: GroupKind, name: &str) -> &'a Value {
    update.field(group, name).unwrap()
}

fn assert_fully_synthetic(update: &SnapshotUpdate) {
    let checks = [
        (GroupKind::Pump, "target_rate", bands::TARGET_RATE),
        (GroupKind::Pump, "flow_rate", bands::FLOW_RATE),
        (GroupKind::Pump2, "target_rate", bands::TARGET_RATE),
        (GroupKind::Pump2, "flow_rate", bands::FLOW_RATE),
        (GroupKind::Solar, "battery_voltage", bands::BATTERY_VOLTAGE),
        (GroupKind::Solar, "battery_percentage", bands::BATTERY_PERCENTAGE),
        (GroupKind::Solar, "panel_power", bands::PANEL_POWER),
        (GroupKind::Solar, "battery_ah", bands::BATTERY_AH),
        (GroupKind::Tank, "tank_level_mm", bands::TANK_LEVEL_MM),
        (GroupKind::Tank, "tank_level_percent", bands::TANK_LEVEL_PERCENT),
        (GroupKind::Skid, "skid_flow", bands::SKID_FLOW),
        (GroupKind::Skid, "skid_pressure", bands::SKID_PRESSURE),
    ];
    for (group, name, band) in checks {
        let value = field(update, group, name).as_f64().unwrap();
        assert!(band.contains(value), "{group}.{name} = {value} outside band");
    }
    assert_eq!(field(update, GroupKind::System, "status"), "running");
}

// =========================================================================
// Live cycles
// =========================================================================

#[tokio::test]
async fn live_cycle_reads_every_source() {
    let mut poller = poller(full_site(), sources(&["pump-a", "pump-b"], &["solar-1", "solar-2"]));
    let outcome = poller.poll_cycle().await;
    assert!(outcome.is_live(), "{outcome:?}");

    let update = outcome.update();
    assert_eq!(field(update, GroupKind::Pump, "flow_rate"), &json!(14.2));
    assert_eq!(field(update, GroupKind::Pump, "pump_state"), "auto");
    assert_eq!(field(update, GroupKind::Pump2, "target_rate"), &json!(12.0));
    assert_eq!(field(update, GroupKind::Tank, "tank_level_percent"), &json!(41.0));
    assert_eq!(field(update, GroupKind::Skid, "skid_pressure"), &json!(3.4));
    assert_eq!(field(update, GroupKind::System, "status"), "running");
}

#[tokio::test]
async fn solar_capacity_is_summed_and_percentage_averaged() {
    let mut poller = poller(full_site(), sources(&["pump-a"], &["solar-1", "solar-2"]));
    let outcome = poller.poll_cycle().await;
    let update = outcome.update();
    assert_eq!(field(update, GroupKind::Solar, "battery_ah"), &json!(100.0));
    assert_eq!(field(update, GroupKind::Solar, "battery_percentage"), &json!(75.0));
}

#[tokio::test]
async fn single_pump_marks_second_slot_unavailable() {
    let mut poller = poller(full_site(), sources(&["pump-a"], &["solar-1"]));
    let outcome = poller.poll_cycle().await;
    assert!(outcome.is_live());
    let update = outcome.update();
    assert_eq!(field(update, GroupKind::Pump, "pump_state"), "auto");
    assert_eq!(field(update, GroupKind::Pump2, "target_rate"), "-");
    assert_eq!(field(update, GroupKind::Pump2, "flow_rate"), "-");
    assert_eq!(field(update, GroupKind::Pump2, "pump_state"), "-");
}

#[tokio::test]
async fn no_solar_controllers_use_fallback_constants() {
    let mut poller = poller(full_site(), sources(&[], &[]));
    let outcome = poller.poll_cycle().await;
    assert!(outcome.is_live());
    let update = outcome.update();
    assert_eq!(field(update, GroupKind::Pump, "flow_rate"), "-");
    assert_eq!(field(update, GroupKind::Solar, "battery_voltage"), &json!(24.0));
    assert_eq!(field(update, GroupKind::Solar, "battery_ah"), &json!(100.0));
}

#[tokio::test]
async fn control_state_other_than_on_means_standby() {
    let reader = full_site().with_tag("control", "state", "off");
    let mut poller = poller(reader, sources(&["pump-a"], &[]));
    let outcome = poller.poll_cycle().await;
    assert_eq!(field(outcome.update(), GroupKind::System, "status"), "standby");
}

#[tokio::test]
async fn missing_control_source_means_standby() {
    let config = SourcesConfig {
        control: None,
        ..sources(&["pump-a"], &[])
    };
    let mut poller = poller(full_site(), config);
    let outcome = poller.poll_cycle().await;
    assert!(outcome.is_live());
    assert_eq!(field(outcome.update(), GroupKind::System, "status"), "standby");
}

#[tokio::test]
async fn unconfigured_tank_is_left_untouched() {
    let config = SourcesConfig {
        tank: None,
        ..sources(&["pump-a"], &[])
    };
    let mut poller = poller(full_site(), config);
    let outcome = poller.poll_cycle().await;
    assert!(outcome.update().group(GroupKind::Tank).is_none());
}

// =========================================================================
// Synthetic fallback
// =========================================================================

#[tokio::test]
async fn missing_tag_falls_back_for_every_group() {
    // `solar-3` is configured but serves no tags.
    let mut poller = poller(full_site(), sources(&["pump-a"], &["solar-1", "solar-3"]));
    let outcome = poller.poll_cycle().await;

    match &outcome {
        PollOutcome::Synthetic { error, .. } => {
            assert!(matches!(error, PollError::Tag { app_key, .. } if app_key == "solar-3"));
        }
        PollOutcome::Live(_) => panic!("expected synthetic fallback"),
    }
    assert_fully_synthetic(outcome.update());
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_and_falls_back() {
    let reader = full_site().with_latency(Duration::from_millis(500));
    let mut poller = poller(reader, sources(&["pump-a"], &[]));
    let outcome = poller.poll_cycle().await;

    match &outcome {
        PollOutcome::Synthetic { error, .. } => {
            assert!(matches!(error, PollError::Timeout { timeout_ms: 150, .. }));
        }
        PollOutcome::Live(_) => panic!("expected synthetic fallback"),
    }
    assert_fully_synthetic(outcome.update());
}

#[tokio::test]
async fn default_config_without_tag_api_runs_synthetic() {
    let config = SiaConfig::default();
    let reader = TagReader::from_config(&config.sources).unwrap();
    let mut poller = SourcePoller::new(reader, config.sources, config.polling.tag_timeout())
        .with_rng(StdRng::seed_from_u64(42));

    let outcome = poller.poll_cycle().await;
    assert!(!outcome.is_live());
    assert!(matches!(
        outcome,
        PollOutcome::Synthetic {
            error: PollError::NoUpstream,
            ..
        }
    ));
    assert_fully_synthetic(outcome.update());
}

#[tokio::test]
async fn offline_reader_ignores_configured_sources() {
    let mut poller = SourcePoller::new(
        TagReader::Offline,
        sources(&["pump-a", "pump-b"], &["solar-1"]),
        TIMEOUT,
    );
    let outcome = poller.poll_cycle().await;
    assert!(!outcome.is_live());
    assert_fully_synthetic(outcome.update());
}

#[tokio::test]
async fn synthetic_cycle_keeps_the_selected_pump_mode() {
    let store = SnapshotStore::new();
    store.set_pump_state(GroupKind::Pump, "calibration").await;
    store.set_pump_state(GroupKind::Pump2, "auto").await;

    let mut poller = poller(FixedTagReader::new(), sources(&["pump-a"], &[]));
    for _ in 0..3 {
        let outcome = poller.poll_cycle().await;
        assert!(!outcome.is_live());
        store.apply(outcome.update()).await;
    }

    let view = store.to_view().await;
    assert_eq!(view.pump.pump_state, "calibration");
    assert_eq!(view.pump2.pump_state, "auto");
    assert!(bands::FLOW_RATE.contains(view.pump.flow_rate.value().unwrap()));
}

#[tokio::test]
async fn non_numeric_reading_falls_back() {
    let reader = full_site().with_tag("pump-a", "flow_rate", "fast");
    let mut poller = poller(reader, sources(&["pump-a"], &[]));
    let outcome = poller.poll_cycle().await;
    assert!(matches!(
        outcome,
        PollOutcome::Synthetic {
            error: PollError::Malformed { expected: "number", .. },
            ..
        }
    ));
}

// =========================================================================
// Poll loop
// =========================================================================

#[derive(Default)]
struct RecordingCallback {
    reports: Vec<CycleReport>,
}

impl PollCallback for RecordingCallback {
    async fn on_cycle(&mut self, report: &CycleReport) {
        self.reports.push(report.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn poll_loop_commits_each_cycle_and_stops_on_shutdown() {
    let store = Arc::new(SnapshotStore::new());
    let shutdown = Shutdown::new();

    let task = {
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut poller = poller(full_site(), sources(&["pump-a"], &["solar-1", "solar-2"]));
            let mut callback = RecordingCallback::default();
            let summary = run_poll_loop(
                &mut poller,
                &store,
                &mut callback,
                &shutdown,
                Duration::from_millis(200),
            )
            .await;
            (summary, callback.reports)
        })
    };

    tokio::time::sleep(Duration::from_millis(900)).await;
    shutdown.request();
    let (summary, reports) = task.await.unwrap();

    assert!(summary.cycles >= 4, "{summary:?}");
    assert_eq!(summary.synthetic, 0);
    assert_eq!(summary.live, summary.cycles);
    assert_eq!(reports.len(), usize::try_from(summary.cycles).unwrap());
    assert!(reports.iter().all(|r| r.live && r.merge.changed()));

    let view = store.to_view().await;
    assert_eq!(view.pump.flow_rate, Reading::Value(14.2));
    assert_eq!(view.pump2.flow_rate, Reading::Unavailable);
    assert_eq!(view.solar.battery_ah, Reading::Value(100.0));
    assert_eq!(view.system.status, "running");
}

#[tokio::test(start_paused = true)]
async fn in_flight_cycle_completes_before_shutdown() {
    let store = Arc::new(SnapshotStore::new());
    let shutdown = Shutdown::new();

    let task = {
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            // Each read takes 40 ms; a cycle over one pump takes 120 ms+.
            let reader = full_site().with_latency(Duration::from_millis(40));
            let mut poller = poller(reader, sources(&["pump-a"], &[]));
            run_poll_loop(
                &mut poller,
                &store,
                &mut NoOpCallback,
                &shutdown,
                Duration::from_secs(10),
            )
            .await
        })
    };

    // Request shutdown while the first cycle is mid-read.
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request();
    let summary = task.await.unwrap();

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.live, 1);
    assert_eq!(store.to_view().await.pump.pump_state, "auto");
}

#[tokio::test(start_paused = true)]
async fn failing_sources_keep_the_loop_running() {
    let store = Arc::new(SnapshotStore::new());
    let shutdown = Shutdown::new();

    let task = {
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut poller = poller(FixedTagReader::new(), sources(&["pump-a"], &[]));
            run_poll_loop(
                &mut poller,
                &store,
                &mut NoOpCallback,
                &shutdown,
                Duration::from_millis(200),
            )
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.request();
    let summary = task.await.unwrap();

    assert!(summary.cycles >= 2);
    assert_eq!(summary.live, 0);
    let view = store.to_view().await;
    assert!(bands::BATTERY_AH.contains(view.solar.battery_ah.value().unwrap()));
    assert!(view.pump2.flow_rate.is_available());
}
