//! Dashboard server for the SIA local control dashboard.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) where each viewer receives the
//!   current snapshot on connect, every subsequent `data_update`, and a
//!   periodic `heartbeat`, and may send `request_data` and
//!   `set_pump_state` commands
//! - **REST endpoints** for the current snapshot, health and viewer count
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The [`Broadcaster`] keeps one bounded queue per viewer. Publishing
//! never waits on a slow viewer: a full queue drops that frame for that
//! viewer only. The snapshot itself lives in
//! [`SnapshotStore`](sia_core::store::SnapshotStore); this crate only
//! reads it and routes viewer commands into it.
//!
//! [`Broadcaster`]: broadcast::Broadcaster

pub mod broadcast;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use broadcast::Broadcaster;
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{ObserverHandle, StartupError, spawn_observer};
pub use state::AppState;
