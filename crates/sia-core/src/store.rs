//! The process-wide dashboard snapshot.
//!
//! [`SnapshotStore`] exclusively owns the current value of every monitored
//! field. Nothing outside this module holds a reference to the snapshot;
//! callers merge partial updates in and read immutable views out.
//!
//! # Consistency
//!
//! The snapshot sits behind a single [`RwLock`]. Every merge takes the
//! write lock for its whole duration, so merges serialize and a reader
//! always observes complete merges, never a group with fields from two
//! different updates. [`SnapshotStore::apply`] extends this to several
//! groups at once, which is how a poll cycle commits as a unit.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sia_types::{
    FieldError, FieldGroup, GroupKind, PartialFields, PumpGroup, SkidGroup, SnapshotUpdate,
    SnapshotView, SolarGroup, SystemGroup, SystemView, TankGroup,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// The mutable snapshot. Private to the store.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    pump: PumpGroup,
    pump2: PumpGroup,
    solar: SolarGroup,
    tank: TankGroup,
    skid: SkidGroup,
    system: SystemGroup,
    timestamp: DateTime<Utc>,
}

impl Snapshot {
    fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            ..Self::default()
        }
    }

    fn group_mut(&mut self, kind: GroupKind) -> &mut dyn FieldSlot {
        match kind {
            GroupKind::Pump => &mut self.pump,
            GroupKind::Pump2 => &mut self.pump2,
            GroupKind::Solar => &mut self.solar,
            GroupKind::Tank => &mut self.tank,
            GroupKind::Skid => &mut self.skid,
            GroupKind::System => &mut self.system,
        }
    }

    /// Apply every present field of one group, collecting rejections.
    fn merge_group(&mut self, kind: GroupKind, fields: &PartialFields, report: &mut MergeReport) {
        let group = self.group_mut(kind);
        for (name, value) in fields {
            match group.assign_field(kind, name, value) {
                Ok(()) => report.applied.push((kind, name.clone())),
                Err(error) => {
                    warn!(group = %kind, field = %name, %error, "rejected malformed field");
                    report.rejected.push(error);
                }
            }
        }
    }

    fn view(&self) -> SnapshotView {
        SnapshotView {
            pump: self.pump.clone(),
            pump2: self.pump2.clone(),
            solar: self.solar.clone(),
            tank: self.tank.clone(),
            skid: self.skid.clone(),
            system: SystemView {
                timestamp: self.timestamp,
                status: self.system.status.clone(),
            },
        }
    }
}

/// Object-safe shim over [`FieldGroup`] so the store can address any
/// group through one code path.
trait FieldSlot {
    fn assign_field(
        &mut self,
        kind: GroupKind,
        field: &str,
        value: &Value,
    ) -> Result<(), FieldError>;
}

impl<T: FieldGroup> FieldSlot for T {
    fn assign_field(
        &mut self,
        kind: GroupKind,
        field: &str,
        value: &Value,
    ) -> Result<(), FieldError> {
        self.assign(kind, field, value)
    }
}

/// Outcome of a merge.
///
/// Merges never fail as a whole. Fields that could not be applied are
/// listed in [`rejected`](Self::rejected) and kept their prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Fields that were written, in application order.
    pub applied: Vec<(GroupKind, String)>,
    /// Fields that were skipped and why.
    pub rejected: Vec<FieldError>,
}

impl MergeReport {
    /// Whether at least one field was written.
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Owner of the current dashboard snapshot.
#[derive(Debug)]
pub struct SnapshotStore {
    inner: RwLock<Snapshot>,
}

impl SnapshotStore {
    /// Create a store holding zero/default values, stamped now.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Snapshot::new()),
        }
    }

    /// Merge partial fields into one group.
    ///
    /// Each present field is coerced to the group's declared type and
    /// overwrites the current value. Absent fields are untouched. A field
    /// that fails coercion is logged and skipped without aborting the rest
    /// of the merge. The snapshot timestamp moves to now when at least one
    /// field was written.
    pub async fn merge(&self, group: GroupKind, fields: &PartialFields) -> MergeReport {
        let mut report = MergeReport::default();
        let mut snapshot = self.inner.write().await;
        snapshot.merge_group(group, fields, &mut report);
        if report.changed() {
            snapshot.timestamp = Utc::now();
        }
        debug!(
            group = %group,
            applied = report.applied.len(),
            rejected = report.rejected.len(),
            "merged group update"
        );
        report
    }

    /// Merge a multi-group update under one lock acquisition.
    ///
    /// Readers see either none or all of the update. The timestamp is set
    /// once for the whole update.
    pub async fn apply(&self, update: &SnapshotUpdate) -> MergeReport {
        let mut report = MergeReport::default();
        let mut snapshot = self.inner.write().await;
        for (group, fields) in update.iter() {
            snapshot.merge_group(group, fields, &mut report);
        }
        if report.changed() {
            snapshot.timestamp = Utc::now();
        }
        debug!(
            applied = report.applied.len(),
            rejected = report.rejected.len(),
            "applied snapshot update"
        );
        report
    }

    /// Set a pump group's mode through the regular merge path.
    pub async fn set_pump_state(&self, pump: GroupKind, state: &str) -> MergeReport {
        let mut fields = PartialFields::new();
        fields.insert(String::from("pump_state"), Value::from(state));
        self.merge(pump, &fields).await
    }

    /// An immutable deep copy of the whole snapshot.
    pub async fn to_view(&self) -> SnapshotView {
        self.inner.read().await.view()
    }

    /// Time of the most recent write.
    pub async fn timestamp(&self) -> DateTime<Utc> {
        self.inner.read().await.timestamp
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use serde_json::json;
    use sia_types::{Reading, TankUpdate};

    use super::*;

    fn fields(value: Value) -> PartialFields {
        match value {
            Value::Object(map) => map,
            _ => PartialFields::new(),
        }
    }

    #[tokio::test]
    async fn new_store_holds_defaults() {
        let store = SnapshotStore::new();
        let view = store.to_view().await;
        assert_eq!(view.pump.pump_state, "standby");
        assert_eq!(view.solar.battery_ah, Reading::Value(0.0));
        assert_eq!(view.system.status, "running");
    }

    #[tokio::test]
    async fn merge_is_field_sparse() {
        let store = SnapshotStore::new();
        store
            .merge(
                GroupKind::Tank,
                &fields(json!({"tank_level_mm": 800.0, "tank_level_percent": 40.0})),
            )
            .await;
        store
            .merge(GroupKind::Tank, &fields(json!({"tank_level_mm": 500})))
            .await;

        let view = store.to_view().await;
        assert_eq!(view.tank.tank_level_mm, Reading::Value(500.0));
        assert_eq!(view.tank.tank_level_percent, Reading::Value(40.0));
    }

    #[tokio::test]
    async fn merge_is_idempotent() {
        let update = fields(json!({"target_rate": 15.0, "flow_rate": "14.5", "pump_state": "auto"}));

        let once = SnapshotStore::new();
        once.merge(GroupKind::Pump, &update).await;

        let twice = SnapshotStore::new();
        twice.merge(GroupKind::Pump, &update).await;
        twice.merge(GroupKind::Pump, &update).await;

        let (a, b) = (once.to_view().await, twice.to_view().await);
        assert_eq!(a.pump, b.pump);
        assert_eq!(a.pump2, b.pump2);
        assert_eq!(a.solar, b.solar);
        assert_eq!(a.system.status, b.system.status);
    }

    #[tokio::test]
    async fn malformed_field_is_skipped_without_aborting_merge() {
        let store = SnapshotStore::new();
        let report = store
            .merge(
                GroupKind::Solar,
                &fields(json!({
                    "battery_voltage": "not-a-number",
                    "battery_percentage": 80.0,
                    "wind_speed": 3.0,
                })),
            )
            .await;

        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.rejected.len(), 2);
        let view = store.to_view().await;
        assert_eq!(view.solar.battery_voltage, Reading::Value(0.0));
        assert_eq!(view.solar.battery_percentage, Reading::Value(80.0));
    }

    #[tokio::test]
    async fn unavailable_marker_is_accepted() {
        let store = SnapshotStore::new();
        store
            .merge(GroupKind::Pump2, &fields(json!({"flow_rate": "-", "pump_state": "-"})))
            .await;
        let view = store.to_view().await;
        assert_eq!(view.pump2.flow_rate, Reading::Unavailable);
        assert_eq!(view.pump2.pump_state, "-");
    }

    #[tokio::test]
    async fn timestamp_moves_only_when_something_changed() {
        let store = SnapshotStore::new();
        let before = store.timestamp().await;

        store
            .merge(GroupKind::Tank, &fields(json!({"tank_level_mm": "deep"})))
            .await;
        assert_eq!(store.timestamp().await, before);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .merge(GroupKind::Tank, &fields(json!({"tank_level_mm": 10.0})))
            .await;
        assert!(store.timestamp().await > before);
    }

    #[tokio::test]
    async fn apply_merges_every_group() {
        let store = SnapshotStore::new();
        let mut update = SnapshotUpdate::new();
        update
            .tank(TankUpdate {
                tank_level_mm: Some(Reading::Value(1200.0)),
                tank_level_percent: None,
            })
            .set(GroupKind::Skid, "skid_pressure", 3.2)
            .set(GroupKind::System, "status", "standby");

        let report = store.apply(&update).await;
        assert_eq!(report.applied.len(), 3);

        let view = store.to_view().await;
        assert_eq!(view.tank.tank_level_mm, Reading::Value(1200.0));
        assert_eq!(view.skid.skid_pressure, Reading::Value(3.2));
        assert_eq!(view.system.status, "standby");
    }

    #[tokio::test]
    async fn set_pump_state_targets_one_pump() {
        let store = SnapshotStore::new();
        store.set_pump_state(GroupKind::Pump2, "calibration").await;
        let view = store.to_view().await;
        assert_eq!(view.pump.pump_state, "standby");
        assert_eq!(view.pump2.pump_state, "calibration");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_observe_a_torn_group() {
        let store = std::sync::Arc::new(SnapshotStore::new());

        let writer = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move {
                for generation in 1..=500_u32 {
                    let value = f64::from(generation);
                    store
                        .merge(
                            GroupKind::Solar,
                            &fields(json!({
                                "battery_voltage": value,
                                "battery_percentage": value,
                                "panel_power": value,
                                "battery_ah": value,
                            })),
                        )
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = std::sync::Arc::clone(&store);
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let solar = store.to_view().await.solar;
                    let voltage = solar.battery_voltage;
                    assert_eq!(solar.battery_percentage, voltage);
                    assert_eq!(solar.panel_power, voltage);
                    assert_eq!(solar.battery_ah, voltage);
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
