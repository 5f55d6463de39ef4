//! Dashboard startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds the listen address eagerly, so a bad address
//! or a taken port is reported to the caller before anything runs, then
//! launches the HTTP server and the heartbeat task in the background.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sia_observer::startup::spawn_observer;
//!
//! let handle = spawn_observer(&server_config, Arc::clone(&state)).await?;
//! // ... later, after the shutdown signal fired:
//! handle.join().await;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::heartbeat::run_heartbeat;
use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the dashboard server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Background tasks of a running dashboard.
#[derive(Debug)]
pub struct ObserverHandle {
    /// The address actually bound.
    pub local_addr: SocketAddr,
    server: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl ObserverHandle {
    /// Wait for the server and heartbeat tasks to finish.
    ///
    /// Both stop on their own once the shared shutdown signal fires.
    pub async fn join(self) {
        if let Err(e) = self.server.await {
            warn!(error = %e, "dashboard server task failed");
        }
        if let Err(e) = self.heartbeat.await {
            warn!(error = %e, "heartbeat task failed");
        }
    }
}

/// Bind the dashboard address and start serving in the background.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, StartupError> {
    let listener = server::bind(config).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("local address unavailable: {e}")))?;

    let server = {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = server::serve(listener, state).await {
                error!(error = %e, "Dashboard server exited with error");
            }
        })
    };
    let heartbeat = tokio::spawn(run_heartbeat(state, config.heartbeat_interval));

    info!(%local_addr, "Dashboard spawned on background tasks");

    Ok(ObserverHandle {
        local_addr,
        server,
        heartbeat,
    })
}
