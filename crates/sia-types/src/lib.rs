//! Shared type definitions for the SIA local control dashboard.
//!
//! This crate is the single source of truth for the snapshot layout and
//! the viewer wire protocol. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the dashboard front end.
//!
//! # Modules
//!
//! - [`groups`] -- Subsystem groups, readings and field coercion
//! - [`snapshot`] -- Serialized snapshot view
//! - [`update`] -- Sparse snapshot updates and typed per-group builders
//! - [`events`] -- Duplex channel messages and the health payload
//! - [`ids`] -- Viewer connection identifiers

pub mod events;
pub mod groups;
pub mod ids;
pub mod snapshot;
pub mod update;

// Re-export all public types at crate root for convenience.
pub use events::{
    ClientEvent, ErrorPayload, HealthStatus, Heartbeat, PumpSelector, ServerEvent, SetPumpState,
};
pub use groups::{
    FieldError, FieldGroup, GroupKind, PumpGroup, PumpMode, Reading, SkidGroup, SolarGroup,
    SystemGroup, SystemStatus, TankGroup, UNAVAILABLE,
};
pub use ids::ViewerId;
pub use snapshot::{SnapshotView, SystemView};
pub use update::{PartialFields, PumpUpdate, SkidUpdate, SnapshotUpdate, SolarUpdate, TankUpdate};
