//! Partial snapshot updates.
//!
//! A [`SnapshotUpdate`] carries, per group, only the fields that should
//! change. Fields that are absent keep their current value when the update
//! is merged. The typed builders ([`PumpUpdate`], [`SolarUpdate`], ...)
//! are the convenient way to construct one from device readings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::groups::{GroupKind, Reading, SystemStatus};

/// The fields to change in one group, keyed by field name.
pub type PartialFields = Map<String, Value>;

/// A sparse update spanning one or more groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotUpdate {
    groups: BTreeMap<GroupKind, PartialFields>,
}

impl SnapshotUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single field, replacing any value already staged for it.
    pub fn set(&mut self, group: GroupKind, field: &str, value: impl Into<Value>) -> &mut Self {
        self.groups
            .entry(group)
            .or_default()
            .insert(field.to_owned(), value.into());
        self
    }

    /// Stage a whole set of partial fields for a group.
    ///
    /// Fields already staged for the group are kept unless `fields`
    /// overrides them.
    pub fn extend_group(&mut self, group: GroupKind, fields: PartialFields) -> &mut Self {
        if !fields.is_empty() {
            self.groups.entry(group).or_default().extend(fields);
        }
        self
    }

    /// Stage pump fields for `pump` or `pump2`.
    pub fn pump(&mut self, group: GroupKind, update: PumpUpdate) -> &mut Self {
        self.extend_group(group, update.into_fields())
    }

    /// Stage solar fields.
    pub fn solar(&mut self, update: SolarUpdate) -> &mut Self {
        self.extend_group(GroupKind::Solar, update.into_fields())
    }

    /// Stage tank fields.
    pub fn tank(&mut self, update: TankUpdate) -> &mut Self {
        self.extend_group(GroupKind::Tank, update.into_fields())
    }

    /// Stage skid fields.
    pub fn skid(&mut self, update: SkidUpdate) -> &mut Self {
        self.extend_group(GroupKind::Skid, update.into_fields())
    }

    /// Stage the system status.
    pub fn system_status(&mut self, status: SystemStatus) -> &mut Self {
        self.set(GroupKind::System, "status", status.as_str())
    }

    /// The staged fields for one group, if any.
    pub fn group(&self, group: GroupKind) -> Option<&PartialFields> {
        self.groups.get(&group)
    }

    /// Iterate over staged groups in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupKind, &PartialFields)> {
        self.groups.iter().map(|(kind, fields)| (*kind, fields))
    }

    /// Whether the update stages no fields at all.
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Map::is_empty)
    }

    /// Look up a staged field value.
    pub fn field(&self, group: GroupKind, field: &str) -> Option<&Value> {
        self.groups.get(&group).and_then(|fields| fields.get(field))
    }
}

fn put(fields: &mut PartialFields, name: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        fields.insert(name.to_owned(), value.into());
    }
}

/// Partial update for a pump group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpUpdate {
    /// New target rate.
    pub target_rate: Option<Reading>,
    /// New measured flow rate.
    pub flow_rate: Option<Reading>,
    /// New pump mode.
    pub pump_state: Option<String>,
}

impl PumpUpdate {
    /// Every field set to the unavailable marker.
    pub fn unavailable() -> Self {
        Self {
            target_rate: Some(Reading::Unavailable),
            flow_rate: Some(Reading::Unavailable),
            pump_state: Some(crate::groups::UNAVAILABLE.to_owned()),
        }
    }

    /// Convert into raw partial fields.
    pub fn into_fields(self) -> PartialFields {
        let mut fields = PartialFields::new();
        put(&mut fields, "target_rate", self.target_rate);
        put(&mut fields, "flow_rate", self.flow_rate);
        put(&mut fields, "pump_state", self.pump_state);
        fields
    }
}

/// Partial update for the solar group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolarUpdate {
    /// New battery voltage.
    pub battery_voltage: Option<Reading>,
    /// New battery percentage.
    pub battery_percentage: Option<Reading>,
    /// New panel power.
    pub panel_power: Option<Reading>,
    /// New remaining capacity.
    pub battery_ah: Option<Reading>,
}

impl SolarUpdate {
    /// Convert into raw partial fields.
    pub fn into_fields(self) -> PartialFields {
        let mut fields = PartialFields::new();
        put(&mut fields, "battery_voltage", self.battery_voltage);
        put(&mut fields, "battery_percentage", self.battery_percentage);
        put(&mut fields, "panel_power", self.panel_power);
        put(&mut fields, "battery_ah", self.battery_ah);
        fields
    }
}

/// Partial update for the tank group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TankUpdate {
    /// New level in millimetres.
    pub tank_level_mm: Option<Reading>,
    /// New level as a percentage.
    pub tank_level_percent: Option<Reading>,
}

impl TankUpdate {
    /// Convert into raw partial fields.
    pub fn into_fields(self) -> PartialFields {
        let mut fields = PartialFields::new();
        put(&mut fields, "tank_level_mm", self.tank_level_mm);
        put(&mut fields, "tank_level_percent", self.tank_level_percent);
        fields
    }
}

/// Partial update for the skid group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkidUpdate {
    /// New skid flow.
    pub skid_flow: Option<Reading>,
    /// New skid pressure.
    pub skid_pressure: Option<Reading>,
}

impl SkidUpdate {
    /// Convert into raw partial fields.
    pub fn into_fields(self) -> PartialFields {
        let mut fields = PartialFields::new();
        put(&mut fields, "skid_flow", self.skid_flow);
        put(&mut fields, "skid_pressure", self.skid_pressure);
        fields
    }
}
