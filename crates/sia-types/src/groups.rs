//! Subsystem groups that make up a dashboard snapshot.
//!
//! Each group is a flat set of named fields. Numeric fields hold a
//! [`Reading`], which is either a float or the unavailable marker `"-"`.
//! State fields hold free-form strings (pump mode, system status).
//!
//! Inbound values arrive as loosely-typed JSON (from the poller or from a
//! viewer command) and are coerced field by field through
//! [`FieldGroup::assign`]. A value that cannot be coerced is rejected for
//! that field only.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use ts_rs::TS;

/// Marker written in place of a number when a source is not configured.
pub const UNAVAILABLE: &str = "-";

// ---------------------------------------------------------------------------
// Group kinds
// ---------------------------------------------------------------------------

/// The fixed set of subsystem groups in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GroupKind {
    /// Primary pump controller.
    Pump,
    /// Secondary pump controller.
    Pump2,
    /// Solar charge controllers (aggregated).
    Solar,
    /// Tank level sensor.
    Tank,
    /// Skid flow and pressure sensors.
    Skid,
    /// Overall system status.
    System,
}

impl GroupKind {
    /// Every group, in serialization order.
    pub const ALL: [Self; 6] = [
        Self::Pump,
        Self::Pump2,
        Self::Solar,
        Self::Tank,
        Self::Skid,
        Self::System,
    ];

    /// The wire name of the group.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Pump2 => "pump2",
            Self::Solar => "solar",
            Self::Tank => "tank",
            Self::Skid => "skid",
            Self::System => "system",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FieldError::UnknownGroup(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single inbound field that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The group name is not one of the fixed groups.
    #[error("unknown group `{0}`")]
    UnknownGroup(String),

    /// The group has no field with this name.
    #[error("unknown field `{group}.{field}`")]
    UnknownField {
        /// The group that was addressed.
        group: GroupKind,
        /// The field name that was not recognised.
        field: String,
    },

    /// The value could not be coerced to the field's declared type.
    #[error("field `{group}.{field}` expects {expected}, got {found}")]
    Coercion {
        /// The group that was addressed.
        group: GroupKind,
        /// The field being assigned.
        field: &'static str,
        /// Human-readable name of the declared type.
        expected: &'static str,
        /// The offending value, rendered as JSON.
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A numeric field value, or the unavailable marker.
///
/// Serializes as a bare JSON number, or as the string `"-"` when
/// unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// A measured or synthetic value.
    Value(f64),
    /// No source is configured for this field.
    Unavailable,
}

impl Reading {
    /// The numeric value, if available.
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    /// Whether this reading carries a number.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Coerce a loosely-typed JSON value into a reading.
    ///
    /// Accepts finite numbers, strings that parse as finite floats, and the
    /// unavailable marker. Everything else is rejected.
    pub fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(Self::Value),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed == UNAVAILABLE {
                    Some(Self::Unavailable)
                } else {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(Self::Value)
                }
            }
            _ => None,
        }
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::Value(0.0)
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<Reading> for Value {
    fn from(reading: Reading) -> Self {
        match reading {
            Reading::Value(v) => Self::from(v),
            Reading::Unavailable => Self::String(UNAVAILABLE.to_owned()),
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::coerce(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a number or \"{UNAVAILABLE}\", got {raw}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Modes and statuses
// ---------------------------------------------------------------------------

/// Operating mode of a pump controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PumpMode {
    /// Idle, waiting for a start command.
    Standby,
    /// Running against its target rate.
    Auto,
    /// Running a calibration sequence.
    Calibration,
}

impl PumpMode {
    /// Every pump mode.
    pub const ALL: [Self; 3] = [Self::Standby, Self::Auto, Self::Calibration];

    /// The wire name of the mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Auto => "auto",
            Self::Calibration => "calibration",
        }
    }
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PumpMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown pump mode `{s}`"))
    }
}

/// Derived overall system status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SystemStatus {
    /// The control application reports the system as on.
    Running,
    /// Anything else.
    Standby,
}

impl SystemStatus {
    /// Derive the status from the control application's state value.
    pub fn from_control_state(state: Option<&str>) -> Self {
        match state {
            Some("on") => Self::Running,
            _ => Self::Standby,
        }
    }

    /// The wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Standby => "standby",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field assignment
// ---------------------------------------------------------------------------

/// A group whose fields can be assigned from loosely-typed JSON.
pub trait FieldGroup {
    /// Names of every field in the group, in serialization order.
    const FIELDS: &'static [&'static str];

    /// Assign one field, coercing the value to the field's declared type.
    ///
    /// On error the field keeps its previous value.
    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError>;
}

fn assign_reading(
    slot: &mut Reading,
    group: GroupKind,
    field: &'static str,
    value: &Value,
) -> Result<(), FieldError> {
    let reading = Reading::coerce(value).ok_or_else(|| FieldError::Coercion {
        group,
        field,
        expected: "a number",
        found: value.to_string(),
    })?;
    *slot = reading;
    Ok(())
}

fn assign_state(
    slot: &mut String,
    group: GroupKind,
    field: &'static str,
    value: &Value,
) -> Result<(), FieldError> {
    let state = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            return Err(FieldError::Coercion {
                group,
                field,
                expected: "a string",
                found: value.to_string(),
            });
        }
    };
    *slot = state;
    Ok(())
}

fn unknown_field(group: GroupKind, field: &str) -> FieldError {
    FieldError::UnknownField {
        group,
        field: field.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Pump controller fields (shared by `pump` and `pump2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PumpGroup {
    /// Commanded flow rate.
    #[ts(type = "number | \"-\"")]
    pub target_rate: Reading,
    /// Measured flow rate.
    #[ts(type = "number | \"-\"")]
    pub flow_rate: Reading,
    /// Current pump mode, or `"-"` when no controller is configured.
    pub pump_state: String,
}

impl PumpGroup {
    /// A pump group with every field set to the unavailable marker.
    pub fn unavailable() -> Self {
        Self {
            target_rate: Reading::Unavailable,
            flow_rate: Reading::Unavailable,
            pump_state: UNAVAILABLE.to_owned(),
        }
    }
}

impl Default for PumpGroup {
    fn default() -> Self {
        Self {
            target_rate: Reading::default(),
            flow_rate: Reading::default(),
            pump_state: PumpMode::Standby.as_str().to_owned(),
        }
    }
}

impl FieldGroup for PumpGroup {
    const FIELDS: &'static [&'static str] = &["target_rate", "flow_rate", "pump_state"];

    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "target_rate" => assign_reading(&mut self.target_rate, group, "target_rate", value),
            "flow_rate" => assign_reading(&mut self.flow_rate, group, "flow_rate", value),
            "pump_state" => assign_state(&mut self.pump_state, group, "pump_state", value),
            other => Err(unknown_field(group, other)),
        }
    }
}

/// Aggregated solar charge controller fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SolarGroup {
    /// Battery voltage (V), averaged across controllers.
    #[ts(type = "number | \"-\"")]
    pub battery_voltage: Reading,
    /// Battery state of charge (%), averaged across controllers.
    #[ts(type = "number | \"-\"")]
    pub battery_percentage: Reading,
    /// Panel power (W), averaged across controllers.
    #[ts(type = "number | \"-\"")]
    pub panel_power: Reading,
    /// Remaining capacity (Ah), summed across controllers.
    #[ts(type = "number | \"-\"")]
    pub battery_ah: Reading,
}

impl FieldGroup for SolarGroup {
    const FIELDS: &'static [&'static str] = &[
        "battery_voltage",
        "battery_percentage",
        "panel_power",
        "battery_ah",
    ];

    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "battery_voltage" => {
                assign_reading(&mut self.battery_voltage, group, "battery_voltage", value)
            }
            "battery_percentage" => assign_reading(
                &mut self.battery_percentage,
                group,
                "battery_percentage",
                value,
            ),
            "panel_power" => assign_reading(&mut self.panel_power, group, "panel_power", value),
            "battery_ah" => assign_reading(&mut self.battery_ah, group, "battery_ah", value),
            other => Err(unknown_field(group, other)),
        }
    }
}

/// Tank level fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TankGroup {
    /// Level above the tank floor in millimetres.
    #[ts(type = "number | \"-\"")]
    pub tank_level_mm: Reading,
    /// Level as a percentage of tank height.
    #[ts(type = "number | \"-\"")]
    pub tank_level_percent: Reading,
}

impl FieldGroup for TankGroup {
    const FIELDS: &'static [&'static str] = &["tank_level_mm", "tank_level_percent"];

    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "tank_level_mm" => {
                assign_reading(&mut self.tank_level_mm, group, "tank_level_mm", value)
            }
            "tank_level_percent" => assign_reading(
                &mut self.tank_level_percent,
                group,
                "tank_level_percent",
                value,
            ),
            other => Err(unknown_field(group, other)),
        }
    }
}

/// Skid flow and pressure sensor fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkidGroup {
    /// Skid flow.
    #[ts(type = "number | \"-\"")]
    pub skid_flow: Reading,
    /// Skid line pressure.
    #[ts(type = "number | \"-\"")]
    pub skid_pressure: Reading,
}

impl FieldGroup for SkidGroup {
    const FIELDS: &'static [&'static str] = &["skid_flow", "skid_pressure"];

    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "skid_flow" => assign_reading(&mut self.skid_flow, group, "skid_flow", value),
            "skid_pressure" => {
                assign_reading(&mut self.skid_pressure, group, "skid_pressure", value)
            }
            other => Err(unknown_field(group, other)),
        }
    }
}

/// System-wide fields. The snapshot timestamp is managed by the store and
/// is not assignable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemGroup {
    /// Overall status (`running` or `standby`).
    pub status: String,
}

impl Default for SystemGroup {
    fn default() -> Self {
        Self {
            status: SystemStatus::Running.as_str().to_owned(),
        }
    }
}

impl FieldGroup for SystemGroup {
    const FIELDS: &'static [&'static str] = &["status"];

    fn assign(&mut self, group: GroupKind, field: &str, value: &Value) -> Result<(), FieldError> {
        match field {
            "status" => assign_state(&mut self.status, group, "status", value),
            other => Err(unknown_field(group, other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn group_kind_round_trips_through_wire_name() {
        for kind in GroupKind::ALL {
            assert_eq!(kind.as_str().parse::<GroupKind>().unwrap(), kind);
        }
        assert_eq!(
            "boiler".parse::<GroupKind>(),
            Err(FieldError::UnknownGroup(String::from("boiler")))
        );
    }

    #[test]
    fn reading_coerces_numbers_and_numeric_strings() {
        assert_eq!(Reading::coerce(&json!(3.5)), Some(Reading::Value(3.5)));
        assert_eq!(Reading::coerce(&json!(7)), Some(Reading::Value(7.0)));
        assert_eq!(Reading::coerce(&json!(" 12.25 ")), Some(Reading::Value(12.25)));
        assert_eq!(Reading::coerce(&json!("-")), Some(Reading::Unavailable));
    }

    #[test]
    fn reading_rejects_non_numeric_values() {
        assert_eq!(Reading::coerce(&json!("full")), None);
        assert_eq!(Reading::coerce(&json!(true)), None);
        assert_eq!(Reading::coerce(&json!(null)), None);
        assert_eq!(Reading::coerce(&json!("NaN")), None);
        assert_eq!(Reading::coerce(&json!([1.0])), None);
    }

    #[test]
    fn reading_serializes_as_number_or_marker() {
        assert_eq!(serde_json::to_value(Reading::Value(1.5)).unwrap(), json!(1.5));
        assert_eq!(serde_json::to_value(Reading::Unavailable).unwrap(), json!("-"));
    }

    #[test]
    fn failed_assignment_keeps_previous_value() {
        let mut tank = TankGroup {
            tank_level_mm: Reading::Value(800.0),
            tank_level_percent: Reading::Value(40.0),
        };
        let result = tank.assign(GroupKind::Tank, "tank_level_mm", &json!("deep"));
        assert!(matches!(result, Err(FieldError::Coercion { field: "tank_level_mm", .. })));
        assert_eq!(tank.tank_level_mm, Reading::Value(800.0));
    }

    #[test]
    fn unknown_field_is_reported() {
        let mut skid = SkidGroup::default();
        let result = skid.assign(GroupKind::Skid, "temperature", &json!(20.0));
        assert_eq!(
            result,
            Err(FieldError::UnknownField {
                group: GroupKind::Skid,
                field: String::from("temperature"),
            })
        );
    }

    #[test]
    fn state_fields_stringify_scalars() {
        let mut system = SystemGroup::default();
        system.assign(GroupKind::System, "status", &json!(1)).unwrap();
        assert_eq!(system.status, "1");
        assert!(system.assign(GroupKind::System, "status", &json!({"a": 1})).is_err());
        assert_eq!(system.status, "1");
    }

    #[test]
    fn system_status_follows_control_state() {
        assert_eq!(SystemStatus::from_control_state(Some("on")), SystemStatus::Running);
        assert_eq!(SystemStatus::from_control_state(Some("off")), SystemStatus::Standby);
        assert_eq!(SystemStatus::from_control_state(None), SystemStatus::Standby);
    }

    #[test]
    fn pump_mode_parses_known_modes_only() {
        assert_eq!("auto".parse::<PumpMode>(), Ok(PumpMode::Auto));
        assert!("turbo".parse::<PumpMode>().is_err());
    }
}
