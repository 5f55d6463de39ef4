//! Engine binary for the SIA local control dashboard.
//!
//! Wires the source poller, the snapshot store, and the dashboard server
//! together, then runs until an interrupt or terminate signal arrives.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `SIA_CONFIG` or `sia-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the snapshot store and shutdown signal
//! 4. Create the tag reader and source poller
//! 5. Start the dashboard server (non-fatal on failure)
//! 6. Run the poll loop until shutdown
//! 7. Drain tasks within the shutdown grace period

mod dashboard_callback;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use sia_core::config::{LoggingConfig, SiaConfig, SourcesConfig};
use sia_core::poller::SourcePoller;
use sia_core::runner::run_poll_loop;
use sia_core::shutdown::Shutdown;
use sia_core::store::SnapshotStore;
use sia_core::tags::TagReader;
use sia_observer::server::ServerConfig;
use sia_observer::spawn_observer;
use sia_observer::state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::dashboard_callback::DashboardCallback;
use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "sia-config.yaml";

/// Application entry point for the dashboard engine.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be
/// loaded, or names an unusable tag API URL. Every other failure is
/// logged and survived.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so report afterwards.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);

    info!("sia-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        host = config.dashboard.host,
        port = config.dashboard.port,
        poll_interval_ms = config.polling.interval_ms,
        tag_timeout_ms = config.polling.tag_timeout_ms,
        pumps = config.sources.pumps.len(),
        solars = config.sources.solars.len(),
        "Effective configuration"
    );

    // 3. Create the snapshot store and shutdown signal.
    let store = Arc::new(SnapshotStore::new());
    let shutdown = Shutdown::new();

    // 4. Create the tag reader and source poller.
    let reader = build_reader(&config.sources)?;
    let mut poller = SourcePoller::new(
        reader,
        config.sources.clone(),
        config.polling.tag_timeout(),
    );

    // 5. Start the dashboard server.
    let app_state = Arc::new(AppState::new(
        Arc::clone(&store),
        shutdown.clone(),
        config.dashboard.viewer_queue_capacity,
    ));
    let observer = match spawn_observer(
        &ServerConfig::from(&config.dashboard),
        Arc::clone(&app_state),
    )
    .await
    {
        Ok(handle) => {
            info!(addr = %handle.local_addr, "Dashboard server started");
            Some(handle)
        }
        Err(e) => {
            error!(error = %e, "Dashboard server failed to start, polling without viewers");
            None
        }
    };

    // 6. Run the poll loop until shutdown.
    let poll_task = {
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        let period = config.polling.interval();
        tokio::spawn(async move {
            let mut callback = DashboardCallback::new(app_state);
            run_poll_loop(&mut poller, &store, &mut callback, &shutdown, period).await
        })
    };

    wait_for_signal().await;
    info!("Shutdown signal received");
    shutdown.request();

    // 7. Drain tasks within the grace period.
    let grace = config.shutdown_grace();
    let drained = tokio::time::timeout(grace, async move {
        let summary = poll_task.await;
        if let Some(handle) = observer {
            handle.join().await;
        }
        summary
    })
    .await;

    match drained {
        Ok(Ok(summary)) => info!(
            cycles = summary.cycles,
            live = summary.live,
            synthetic = summary.synthetic,
            "sia-engine shutdown complete"
        ),
        Ok(Err(e)) => error!(error = %e, "Poll task failed"),
        Err(_) => warn!(
            grace_ms = config.shutdown_grace_ms,
            "Shutdown grace period elapsed with tasks still running"
        ),
    }

    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `SIA_CONFIG` or `sia-config.yaml`.
///
/// Returns the path that was read, or `None` when no file exists and the
/// defaults (plus environment overrides) are used.
fn load_config() -> Result<(SiaConfig, Option<PathBuf>), EngineError> {
    let config_path = std::env::var_os("SIA_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        let config = SiaConfig::from_file(&config_path)?;
        Ok((config, Some(config_path)))
    } else {
        let mut config = SiaConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, None))
    }
}

/// Pick the tag reader for the configured sources.
fn build_reader(sources: &SourcesConfig) -> Result<TagReader, EngineError> {
    let reader = TagReader::from_config(sources)?;
    if reader.is_offline() {
        warn!("No tag API configured, the dashboard will show simulated values");
    } else {
        info!(url = ?sources.tag_api_url, "Reading tags over HTTP");
    }
    Ok(reader)
}

/// Resolve once the process is asked to stop.
async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for terminate signal");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
