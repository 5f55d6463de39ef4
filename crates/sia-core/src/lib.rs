//! Snapshot ownership, source polling and configuration for the SIA local
//! control dashboard.
//!
//! This crate owns the poll side of the dashboard: the process-wide
//! snapshot, the readers that fetch tags from the controller
//! applications, and the loop that turns reads into snapshot updates.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `sia-config.yaml` into
//!   strongly-typed structs.
//! - [`store`] -- [`SnapshotStore`], the lock-guarded snapshot owner.
//! - [`tags`] -- [`TagReader`] over the HTTP tag API or a fixed table.
//! - [`aggregate`] -- Pump slot mapping and solar controller reduction.
//! - [`synthetic`] -- Banded random values for degraded cycles.
//! - [`poller`] -- [`SourcePoller`], one all-or-nothing read per cycle.
//! - [`runner`] -- The periodic poll loop and its callback.
//! - [`shutdown`] -- The shared shutdown signal.
//!
//! [`SnapshotStore`]: store::SnapshotStore
//! [`TagReader`]: tags::TagReader
//! [`SourcePoller`]: poller::SourcePoller

pub mod aggregate;
pub mod config;
pub mod poller;
pub mod runner;
pub mod shutdown;
pub mod store;
pub mod synthetic;
pub mod tags;
