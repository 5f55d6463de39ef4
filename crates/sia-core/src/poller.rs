//! Source polling with whole-cycle synthetic fallback.
//!
//! One poll cycle reads every configured tag from its owning application,
//! aggregates pump and solar controllers, and produces a single
//! [`SnapshotUpdate`]. The cycle is all-or-nothing: the first read that
//! fails or times out abandons the real read, and the cycle instead yields
//! a fully synthetic update covering every group.
//!
//! Failures never leave this module as errors. They surface as
//! [`PollOutcome::Synthetic`] carrying the [`PollError`] that caused it.
//! A poller over [`TagReader::Offline`] never reads and always yields
//! synthetic values.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sia_types::{GroupKind, Reading, SkidUpdate, SnapshotUpdate, SystemStatus, TankUpdate};
use tracing::{debug, error};

use crate::aggregate::{self, PumpReading, SolarReading};
use crate::config::{SourcesConfig, TagNames};
use crate::synthetic;
use crate::tags::{TagError, TagReader, TagValue};

/// Why a poll cycle fell back to synthetic values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// The tag reader reported a failure.
    #[error("reading `{tag}` from `{app_key}` failed: {source}")]
    Tag {
        /// The application that was queried.
        app_key: String,
        /// The tag that was requested.
        tag: String,
        /// The underlying reader error.
        source: TagError,
    },

    /// The read did not complete within the tag timeout.
    #[error("reading `{tag}` from `{app_key}` timed out after {timeout_ms} ms")]
    Timeout {
        /// The application that was queried.
        app_key: String,
        /// The tag that was requested.
        tag: String,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The tag answered with a value of the wrong shape.
    #[error("tag `{tag}` on `{app_key}` is not a {expected}")]
    Malformed {
        /// The application that was queried.
        app_key: String,
        /// The tag that was requested.
        tag: String,
        /// What the poller needed.
        expected: &'static str,
    },

    /// There is no tag API to read from.
    #[error("no tag API configured")]
    NoUpstream,
}

/// The result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Every read succeeded.
    Live(SnapshotUpdate),
    /// A read failed; the update holds synthetic values for every group.
    Synthetic {
        /// The synthetic update to commit.
        update: SnapshotUpdate,
        /// The failure that triggered the fallback.
        error: PollError,
    },
}

impl PollOutcome {
    /// The update to merge into the store.
    pub const fn update(&self) -> &SnapshotUpdate {
        match self {
            Self::Live(update) | Self::Synthetic { update, .. } => update,
        }
    }

    /// Whether the values came from the real sources.
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

/// Reads the configured tags and turns them into snapshot updates.
#[derive(Debug)]
pub struct SourcePoller {
    reader: TagReader,
    sources: SourcesConfig,
    tag_timeout: Duration,
    rng: StdRng,
}

impl SourcePoller {
    /// Create a poller over `sources`, bounding every read by `tag_timeout`.
    pub fn new(reader: TagReader, sources: SourcesConfig, tag_timeout: Duration) -> Self {
        Self {
            reader,
            sources,
            tag_timeout,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the random source used for synthetic values.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// The source applications this poller reads.
    pub const fn sources(&self) -> &SourcesConfig {
        &self.sources
    }

    /// Run one cycle: a live read, or synthetic values if it failed.
    pub async fn poll_cycle(&mut self) -> PollOutcome {
        match self.read_sources().await {
            Ok(update) => PollOutcome::Live(update),
            Err(poll_error) => {
                // Offline mode is announced once at startup.
                if poll_error == PollError::NoUpstream {
                    debug!("no upstream, committing synthetic values");
                } else {
                    error!(
                        error = %poll_error,
                        reader = self.reader.name(),
                        "source read failed, committing synthetic values"
                    );
                }
                PollOutcome::Synthetic {
                    update: synthetic::generate(&mut self.rng),
                    error: poll_error,
                }
            }
        }
    }

    /// Read every configured source once.
    ///
    /// Stops at the first failing read.
    ///
    /// # Errors
    ///
    /// Returns the first [`PollError`] hit, or [`PollError::NoUpstream`]
    /// when the reader is offline.
    pub async fn read_sources(&self) -> Result<SnapshotUpdate, PollError> {
        if self.reader.is_offline() {
            return Err(PollError::NoUpstream);
        }
        let tags = &self.sources.tags;
        let mut update = SnapshotUpdate::new();

        let mut pumps = Vec::with_capacity(2);
        for app in self.sources.pumps.iter().take(2) {
            pumps.push(self.read_pump(app, tags).await?);
        }
        let [pump, pump2] = aggregate::pump_updates(pumps);
        update.pump(GroupKind::Pump, pump).pump(GroupKind::Pump2, pump2);

        let mut solars = Vec::with_capacity(self.sources.solars.len());
        for app in &self.sources.solars {
            solars.push(self.read_solar(app, tags).await?);
        }
        update.solar(aggregate::solar_update(&solars));

        if let Some(app) = &self.sources.tank {
            update.tank(TankUpdate {
                tank_level_mm: Some(self.read_reading(app, &tags.tank_level_mm).await?),
                tank_level_percent: Some(self.read_reading(app, &tags.tank_level_percent).await?),
            });
        }

        if let Some(app) = &self.sources.skid {
            update.skid(SkidUpdate {
                skid_flow: Some(self.read_reading(app, &tags.skid_flow).await?),
                skid_pressure: Some(self.read_reading(app, &tags.skid_pressure).await?),
            });
        }

        let control_state = match &self.sources.control {
            Some(app) => Some(self.read_text(app, &tags.control_state).await?),
            None => None,
        };
        update.system_status(SystemStatus::from_control_state(control_state.as_deref()));

        debug!(
            pumps = self.sources.pumps.len(),
            solars = solars.len(),
            status = ?control_state,
            "live poll cycle complete"
        );
        Ok(update)
    }

    async fn read_pump(&self, app: &str, tags: &TagNames) -> Result<PumpReading, PollError> {
        Ok(PumpReading {
            target_rate: self.read_number(app, &tags.target_rate).await?,
            flow_rate: self.read_number(app, &tags.flow_rate).await?,
            pump_state: self.read_text(app, &tags.pump_state).await?,
        })
    }

    async fn read_solar(&self, app: &str, tags: &TagNames) -> Result<SolarReading, PollError> {
        Ok(SolarReading {
            battery_voltage: self.read_number(app, &tags.battery_voltage).await?,
            battery_percentage: self.read_number(app, &tags.battery_percentage).await?,
            panel_power: self.read_number(app, &tags.panel_power).await?,
            battery_ah: self.read_number(app, &tags.battery_ah).await?,
        })
    }

    async fn read_reading(&self, app: &str, tag: &str) -> Result<Reading, PollError> {
        self.read_number(app, tag).await.map(Reading::Value)
    }

    async fn read_number(&self, app: &str, tag: &str) -> Result<f64, PollError> {
        self.read(app, tag)
            .await?
            .as_number()
            .ok_or_else(|| malformed(app, tag, "number"))
    }

    async fn read_text(&self, app: &str, tag: &str) -> Result<String, PollError> {
        self.read(app, tag)
            .await?
            .as_text()
            .ok_or_else(|| malformed(app, tag, "string"))
    }

    /// One bounded tag read.
    async fn read(&self, app: &str, tag: &str) -> Result<TagValue, PollError> {
        match tokio::time::timeout(self.tag_timeout, self.reader.get_tag(tag, app)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PollError::Tag {
                app_key: app.to_owned(),
                tag: tag.to_owned(),
                source,
            }),
            Err(_elapsed) => Err(PollError::Timeout {
                app_key: app.to_owned(),
                tag: tag.to_owned(),
                timeout_ms: u64::try_from(self.tag_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

fn malformed(app: &str, tag: &str, expected: &'static str) -> PollError {
    PollError::Malformed {
        app_key: app.to_owned(),
        tag: tag.to_owned(),
        expected,
    }
}
