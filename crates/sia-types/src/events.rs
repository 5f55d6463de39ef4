//! Messages exchanged with viewers over the duplex channel.
//!
//! Every WebSocket text frame is a JSON object of the form
//! `{"event": <name>, "data": <payload>}`. Connection and disconnection
//! are the WebSocket lifecycle itself and have no message of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::groups::GroupKind;
use crate::snapshot::SnapshotView;

/// Server-to-viewer messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// The full current snapshot.
    DataUpdate(Box<SnapshotView>),
    /// Periodic liveness signal.
    Heartbeat(Heartbeat),
    /// A viewer command was malformed or rejected.
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wrap a snapshot view in a `data_update` event.
    pub fn data_update(view: SnapshotView) -> Self {
        Self::DataUpdate(Box::new(view))
    }

    /// A heartbeat stamped with the current time.
    pub fn heartbeat_now() -> Self {
        Self::Heartbeat(Heartbeat {
            timestamp: Utc::now(),
        })
    }

    /// An error event carrying a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// The wire name of the event, for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DataUpdate(_) => "data_update",
            Self::Heartbeat(_) => "heartbeat",
            Self::Error(_) => "error",
        }
    }
}

/// Payload of a `heartbeat` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Heartbeat {
    /// Server time when the heartbeat was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorPayload {
    /// Human-readable description.
    pub message: String,
}

/// Viewer-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientEvent {
    /// Ask for the current snapshot right now.
    RequestData,
    /// Change a pump's operating mode.
    SetPumpState(SetPumpState),
}

/// Payload of a `set_pump_state` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SetPumpState {
    /// Requested mode (`standby`, `auto` or `calibration`).
    pub state: String,
    /// Which pump to command. Defaults to the primary pump.
    #[serde(default)]
    pub pump: PumpSelector,
}

/// Addressable pump groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PumpSelector {
    /// The `pump` group.
    #[default]
    Pump,
    /// The `pump2` group.
    Pump2,
}

impl PumpSelector {
    /// The snapshot group this selector addresses.
    pub const fn group(self) -> GroupKind {
        match self {
            Self::Pump => GroupKind::Pump,
            Self::Pump2 => GroupKind::Pump2,
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HealthStatus {
    /// Always `healthy` while the server is answering.
    pub status: String,
    /// Server time of the response.
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    /// A healthy status stamped with the current time.
    pub fn healthy() -> Self {
        Self {
            status: String::from("healthy"),
            timestamp: Utc::now(),
        }
    }
}
