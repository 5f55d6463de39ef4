//! Configuration loading and typed config structures for the dashboard.
//!
//! The configuration lives in `sia-config.yaml` next to the binary. This
//! module defines strongly-typed structs that mirror the YAML structure,
//! and provides a loader that reads, overrides and validates the file.
//! Every field has a default so an empty (or missing) file is valid.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level dashboard configuration.
///
/// Mirrors the structure of `sia-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiaConfig {
    /// Viewer-facing server settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Poll cadence and per-read timeout.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Which external applications to read tags from.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// How long shutdown waits for in-flight work, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for SiaConfig {
    fn default() -> Self {
        Self {
            dashboard: DashboardConfig::default(),
            polling: PollingConfig::default(),
            sources: SourcesConfig::default(),
            logging: LoggingConfig::default(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl SiaConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SIA_TAG_API_URL` overrides `sources.tag_api_url`
    /// - `SIA_DASHBOARD_HOST` overrides `dashboard.host`
    /// - `SIA_DASHBOARD_PORT` overrides `dashboard.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// This lets a container deployment point the dashboard at a tag API
    /// or move its port without editing the YAML file.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SIA_TAG_API_URL") {
            self.sources.tag_api_url = Some(val);
        }
        if let Ok(val) = std::env::var("SIA_DASHBOARD_HOST") {
            self.dashboard.host = val;
        }
        if let Ok(val) = std::env::var("SIA_DASHBOARD_PORT") {
            self.dashboard.port = val.parse().map_err(|e| ConfigError::Invalid {
                message: format!("SIA_DASHBOARD_PORT `{val}` is not a port: {e}"),
            })?;
        }
        Ok(())
    }

    /// Reject values that would make the runtime misbehave.
    ///
    /// Zero periods would spin the poll and heartbeat loops, and a zero
    /// viewer queue cannot hold the first snapshot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.polling.interval_ms == 0, "polling.interval_ms must be > 0"),
            (self.polling.tag_timeout_ms == 0, "polling.tag_timeout_ms must be > 0"),
            (
                self.dashboard.heartbeat_interval_ms == 0,
                "dashboard.heartbeat_interval_ms must be > 0",
            ),
            (
                self.dashboard.viewer_queue_capacity == 0,
                "dashboard.viewer_queue_capacity must be > 0",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid {
                message: (*message).to_owned(),
            }),
            None => Ok(()),
        }
    }

    /// Time allowed for tasks to drain after a shutdown request.
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Viewer-facing server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Period of the heartbeat pushed to every viewer.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Frames buffered per viewer before new frames are dropped for it.
    #[serde(default = "default_viewer_queue_capacity")]
    pub viewer_queue_capacity: usize,
}

impl DashboardConfig {
    /// Heartbeat period as a [`Duration`].
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            viewer_queue_capacity: default_viewer_queue_capacity(),
        }
    }
}

/// Poll cadence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollingConfig {
    /// Period between poll cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound on a single tag read.
    #[serde(default = "default_tag_timeout_ms")]
    pub tag_timeout_ms: u64,
}

impl PollingConfig {
    /// Poll period as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Tag read timeout as a [`Duration`].
    pub const fn tag_timeout(&self) -> Duration {
        Duration::from_millis(self.tag_timeout_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            tag_timeout_ms: default_tag_timeout_ms(),
        }
    }
}

/// External applications that own the monitored tags.
///
/// Each entry is the app key the tag API knows the application by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourcesConfig {
    /// Base URL of the tag API. When unset the poller has no upstream and
    /// every cycle commits synthetic values.
    #[serde(default)]
    pub tag_api_url: Option<String>,

    /// Pump controllers, in `pump`, `pump2` order.
    #[serde(default)]
    pub pumps: Vec<String>,

    /// Solar charge controllers.
    #[serde(default)]
    pub solars: Vec<String>,

    /// Tank level application.
    #[serde(default)]
    pub tank: Option<String>,

    /// Skid flow/pressure sensor application.
    #[serde(default)]
    pub skid: Option<String>,

    /// Control application whose state drives `system.status`.
    #[serde(default)]
    pub control: Option<String>,

    /// Tag names read from each application.
    #[serde(default)]
    pub tags: TagNames,
}

/// Names of the tags read from each source application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagNames {
    /// Pump target rate.
    #[serde(default = "tag::target_rate")]
    pub target_rate: String,
    /// Pump measured flow rate.
    #[serde(default = "tag::flow_rate")]
    pub flow_rate: String,
    /// Pump mode.
    #[serde(default = "tag::pump_state")]
    pub pump_state: String,
    /// Solar battery voltage.
    #[serde(default = "tag::battery_voltage")]
    pub battery_voltage: String,
    /// Solar battery charge percentage.
    #[serde(default = "tag::battery_percentage")]
    pub battery_percentage: String,
    /// Solar panel power.
    #[serde(default = "tag::panel_power")]
    pub panel_power: String,
    /// Solar battery capacity in amp-hours.
    #[serde(default = "tag::battery_ah")]
    pub battery_ah: String,
    /// Tank level in millimetres.
    #[serde(default = "tag::tank_level_mm")]
    pub tank_level_mm: String,
    /// Tank level as a percentage.
    #[serde(default = "tag::tank_level_percent")]
    pub tank_level_percent: String,
    /// Skid flow.
    #[serde(default = "tag::skid_flow")]
    pub skid_flow: String,
    /// Skid pressure.
    #[serde(default = "tag::skid_pressure")]
    pub skid_pressure: String,
    /// Tag on the control application holding `on`/`off`.
    #[serde(default = "tag::control_state")]
    pub control_state: String,
}

impl Default for TagNames {
    fn default() -> Self {
        Self {
            target_rate: tag::target_rate(),
            flow_rate: tag::flow_rate(),
            pump_state: tag::pump_state(),
            battery_voltage: tag::battery_voltage(),
            battery_percentage: tag::battery_percentage(),
            panel_power: tag::panel_power(),
            battery_ah: tag::battery_ah(),
            tank_level_mm: tag::tank_level_mm(),
            tank_level_percent: tag::tank_level_percent(),
            skid_flow: tag::skid_flow(),
            skid_pressure: tag::skid_pressure(),
            control_state: tag::control_state(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8091
}

const fn default_heartbeat_interval_ms() -> u64 {
    1000
}

const fn default_viewer_queue_capacity() -> usize {
    64
}

const fn default_poll_interval_ms() -> u64 {
    200
}

const fn default_tag_timeout_ms() -> u64 {
    150
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_shutdown_grace_ms() -> u64 {
    5000
}

/// Default tag names, equal to the snapshot field they feed.
mod tag {
    macro_rules! tag_default {
        ($($name:ident => $tag:literal),* $(,)?) => {
            $(
                pub(super) fn $name() -> String {
                    String::from($tag)
                }
            )*
        };
    }

    tag_default! {
        target_rate => "target_rate",
        flow_rate => "flow_rate",
        pump_state => "pump_state",
        battery_voltage => "battery_voltage",
        battery_percentage => "battery_percentage",
        panel_power => "panel_power",
        battery_ah => "battery_ah",
        tank_level_mm => "tank_level_mm",
        tank_level_percent => "tank_level_percent",
        skid_flow => "skid_flow",
        skid_pressure => "skid_pressure",
        control_state => "state",
    }
}
