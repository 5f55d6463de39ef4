//! Reduction of per-controller readings into snapshot groups.
//!
//! Pump controllers map one-to-one onto the `pump` and `pump2` slots.
//! Solar controllers are combined: voltage, percentage and panel power
//! are averaged while remaining capacity (ampere-hours) is summed, since
//! the banks add up.

use sia_types::{PumpUpdate, Reading, SolarUpdate};

/// Battery voltage shown when no solar controller is configured.
pub const FALLBACK_BATTERY_VOLTAGE: f64 = 24.0;
/// Battery percentage shown when no solar controller is configured.
pub const FALLBACK_BATTERY_PERCENTAGE: f64 = 75.0;
/// Panel power shown when no solar controller is configured.
pub const FALLBACK_PANEL_POWER: f64 = 28.0;
/// Remaining capacity shown when no solar controller is configured.
pub const FALLBACK_BATTERY_AH: f64 = 100.0;

/// One pump controller's tags for a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpReading {
    /// Commanded rate.
    pub target_rate: f64,
    /// Measured rate.
    pub flow_rate: f64,
    /// Operating mode as reported by the controller.
    pub pump_state: String,
}

impl PumpReading {
    fn into_update(self) -> PumpUpdate {
        PumpUpdate {
            target_rate: Some(Reading::Value(self.target_rate)),
            flow_rate: Some(Reading::Value(self.flow_rate)),
            pump_state: Some(self.pump_state),
        }
    }
}

/// One solar charge controller's tags for a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarReading {
    /// Battery voltage in volts.
    pub battery_voltage: f64,
    /// State of charge in percent.
    pub battery_percentage: f64,
    /// Panel power in watts.
    pub panel_power: f64,
    /// Remaining capacity in ampere-hours.
    pub battery_ah: f64,
}

/// Map pump controllers onto the `pump` and `pump2` slots.
///
/// A slot without a controller gets the unavailable marker in every
/// field. Controllers beyond the second are ignored.
pub fn pump_updates(readings: Vec<PumpReading>) -> [PumpUpdate; 2] {
    let mut readings = readings.into_iter().map(PumpReading::into_update);
    let pump = readings.next().unwrap_or_else(PumpUpdate::unavailable);
    let pump2 = readings.next().unwrap_or_else(PumpUpdate::unavailable);
    [pump, pump2]
}

/// Combine solar controllers into the single `solar` group.
///
/// With no controllers the fixed fallback values are used.
pub fn solar_update(readings: &[SolarReading]) -> SolarUpdate {
    if readings.is_empty() {
        return SolarUpdate {
            battery_voltage: Some(Reading::Value(FALLBACK_BATTERY_VOLTAGE)),
            battery_percentage: Some(Reading::Value(FALLBACK_BATTERY_PERCENTAGE)),
            panel_power: Some(Reading::Value(FALLBACK_PANEL_POWER)),
            battery_ah: Some(Reading::Value(FALLBACK_BATTERY_AH)),
        };
    }

    SolarUpdate {
        battery_voltage: Some(Reading::Value(mean(readings.iter().map(|r| r.battery_voltage)))),
        battery_percentage: Some(Reading::Value(mean(
            readings.iter().map(|r| r.battery_percentage),
        ))),
        panel_power: Some(Reading::Value(mean(readings.iter().map(|r| r.panel_power)))),
        battery_ah: Some(Reading::Value(readings.iter().map(|r| r.battery_ah).sum())),
    }
}

/// Arithmetic mean; zero for an empty iterator.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0.0), |(sum, count), v| (sum + v, count + 1.0));
    if count > 0.0 { sum / count } else { 0.0 }
}
