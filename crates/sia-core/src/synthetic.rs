//! Plausible synthetic readings for cycles where the real read failed.
//!
//! Every numeric field is drawn uniformly from `nominal ± spread`. The
//! update covers every group, including `pump2`, so a degraded dashboard
//! still shows a complete picture.
//!
//! `pump_state` is a mode, not a measurement. Synthetic updates leave it
//! alone so the last known or viewer-selected mode stays on screen.

use rand::Rng;
use sia_types::{
    GroupKind, PumpUpdate, Reading, SkidUpdate, SnapshotUpdate, SolarUpdate, SystemStatus,
    TankUpdate,
};

/// A nominal value and the half-width of the band around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Centre of the band.
    pub nominal: f64,
    /// Maximum distance from the centre.
    pub spread: f64,
}

impl Band {
    const fn new(nominal: f64, spread: f64) -> Self {
        Self { nominal, spread }
    }

    /// Lowest value the band can produce.
    pub const fn min(self) -> f64 {
        self.nominal - self.spread
    }

    /// Highest value the band can produce.
    pub const fn max(self) -> f64 {
        self.nominal + self.spread
    }

    /// Whether `value` lies inside the band.
    pub fn contains(self, value: f64) -> bool {
        (self.min()..=self.max()).contains(&value)
    }

    /// Draw a reading from the band.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Reading {
        Reading::Value(rng.random_range(self.min()..=self.max()))
    }
}

pub mod bands {
    //! Synthetic bands per field.

    use super::Band;

    /// Pump target rate.
    pub const TARGET_RATE: Band = Band::new(15.0, 2.0);
    /// Pump measured flow rate.
    pub const FLOW_RATE: Band = Band::new(14.5, 1.5);
    /// Solar battery voltage (V).
    pub const BATTERY_VOLTAGE: Band = Band::new(24.0, 2.0);
    /// Solar battery charge (%).
    pub const BATTERY_PERCENTAGE: Band = Band::new(75.0, 15.0);
    /// Solar panel power (W).
    pub const PANEL_POWER: Band = Band::new(28.0, 3.0);
    /// Solar battery capacity (Ah).
    pub const BATTERY_AH: Band = Band::new(100.0, 20.0);
    /// Tank level (mm).
    pub const TANK_LEVEL_MM: Band = Band::new(1000.0, 300.0);
    /// Tank level (%).
    pub const TANK_LEVEL_PERCENT: Band = Band::new(50.0, 20.0);
    /// Skid flow.
    pub const SKID_FLOW: Band = Band::new(12.0, 2.0);
    /// Skid pressure.
    pub const SKID_PRESSURE: Band = Band::new(3.5, 0.5);
}

/// Build a full synthetic update for every group.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> SnapshotUpdate {
    let mut update = SnapshotUpdate::new();
    for group in [GroupKind::Pump, GroupKind::Pump2] {
        let pump = synthetic_pump(rng);
        update.pump(group, pump);
    }
    update
        .solar(SolarUpdate {
            battery_voltage: Some(bands::BATTERY_VOLTAGE.sample(rng)),
            battery_percentage: Some(bands::BATTERY_PERCENTAGE.sample(rng)),
            panel_power: Some(bands::PANEL_POWER.sample(rng)),
            battery_ah: Some(bands::BATTERY_AH.sample(rng)),
        })
        .tank(TankUpdate {
            tank_level_mm: Some(bands::TANK_LEVEL_MM.sample(rng)),
            tank_level_percent: Some(bands::TANK_LEVEL_PERCENT.sample(rng)),
        })
        .skid(SkidUpdate {
            skid_flow: Some(bands::SKID_FLOW.sample(rng)),
            skid_pressure: Some(bands::SKID_PRESSURE.sample(rng)),
        })
        .system_status(SystemStatus::Running);
    update
}

fn synthetic_pump<R: Rng + ?Sized>(rng: &mut R) -> PumpUpdate {
    PumpUpdate {
        target_rate: Some(bands::TARGET_RATE.sample(rng)),
        flow_rate: Some(bands::FLOW_RATE.sample(rng)),
        pump_state: None,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn number(update: &SnapshotUpdate, group: GroupKind, field: &str) -> f64 {
        update
            .field(group, field)
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(f64::NAN)
    }

    #[test]
    fn every_field_lies_in_its_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let update = generate(&mut rng);
            for group in [GroupKind::Pump, GroupKind::Pump2] {
                assert!(bands::TARGET_RATE.contains(number(&update, group, "target_rate")));
                assert!(bands::FLOW_RATE.contains(number(&update, group, "flow_rate")));
            }
            let checks = [
                (GroupKind::Solar, "battery_voltage", bands::BATTERY_VOLTAGE),
                (GroupKind::Solar, "battery_percentage", bands::BATTERY_PERCENTAGE),
                (GroupKind::Solar, "panel_power", bands::PANEL_POWER),
                (GroupKind::Solar, "battery_ah", bands::BATTERY_AH),
                (GroupKind::Tank, "tank_level_mm", bands::TANK_LEVEL_MM),
                (GroupKind::Tank, "tank_level_percent", bands::TANK_LEVEL_PERCENT),
                (GroupKind::Skid, "skid_flow", bands::SKID_FLOW),
                (GroupKind::Skid, "skid_pressure", bands::SKID_PRESSURE),
            ];
            for (group, field, band) in checks {
                let value = number(&update, group, field);
                assert!(band.contains(value), "{group}.{field} = {value}");
            }
        }
    }

    #[test]
    fn pump_mode_is_untouched_and_status_is_running() {
        let mut rng = StdRng::seed_from_u64(11);
        let update = generate(&mut rng);
        for group in [GroupKind::Pump, GroupKind::Pump2] {
            assert_eq!(update.field(group, "pump_state"), None);
        }
        assert_eq!(
            update.field(GroupKind::System, "status"),
            Some(&serde_json::json!("running"))
        );
    }

    #[test]
    fn same_seed_gives_same_update() {
        let a = generate(&mut StdRng::seed_from_u64(3));
        let b = generate(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
