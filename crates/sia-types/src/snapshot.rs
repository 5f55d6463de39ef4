//! Serialized form of the dashboard snapshot.
//!
//! [`SnapshotView`] is the immutable copy handed to viewers, both as the
//! body of `GET /api/data` and as the payload of every `data_update`
//! push. The system timestamp is nested under `system` so the layout
//! matches what the dashboard front end already consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::groups::{PumpGroup, SkidGroup, SolarGroup, TankGroup};

/// Immutable deep copy of every group at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SnapshotView {
    /// Primary pump.
    pub pump: PumpGroup,
    /// Secondary pump.
    pub pump2: PumpGroup,
    /// Aggregated solar controllers.
    pub solar: SolarGroup,
    /// Tank level.
    pub tank: TankGroup,
    /// Skid flow and pressure.
    pub skid: SkidGroup,
    /// Capture time and overall status.
    pub system: SystemView,
}

/// The `system` block of a serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemView {
    /// Wall-clock time of the most recent write (ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// Overall status (`running` or `standby`).
    pub status: String,
}
