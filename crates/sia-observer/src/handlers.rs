//! REST endpoint handlers for the dashboard server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/data` | Current full snapshot |
//! | `GET` | `/api/health` | Liveness probe |
//! | `GET` | `/api/viewers` | Connected viewer count |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{Html, IntoResponse};
use serde::{Deserialize, Serialize};
use sia_types::{HealthStatus, SnapshotView};

use crate::error::ObserverError;
use crate::state::AppState;

/// Body of `GET /api/viewers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerCount {
    /// Number of open viewer sessions.
    pub count: usize,
}

/// Serve a minimal HTML page with the system status and API links.
///
/// Status strings come from upstream tags and are escaped.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.store.to_view().await;
    let viewers = state.broadcaster.viewer_count().await;
    let status = html_escape(&view.system.status);
    let updated = view.system.timestamp.to_rfc3339();
    let pump_state = html_escape(&view.pump.pump_state);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>SIA Local Control</title>
    <style>
        body {{ font-family: system-ui, sans-serif; background: #10151c; color: #d8dee9; padding: 2rem; }}
        h1 {{ color: #88c0d0; margin-bottom: 0.25rem; }}
        dl {{ display: grid; grid-template-columns: max-content auto; gap: 0.4rem 1.5rem; }}
        dt {{ color: #81a1c1; }}
        code {{ color: #a3be8c; }}
        a {{ color: #88c0d0; }}
    </style>
</head>
<body>
    <h1>SIA Local Control</h1>
    <dl>
        <dt>System</dt><dd>{status}</dd>
        <dt>Pump</dt><dd>{pump_state}</dd>
        <dt>Last update</dt><dd>{updated}</dd>
        <dt>Viewers</dt><dd>{viewers}</dd>
    </dl>
    <h2>API</h2>
    <ul>
        <li><code>GET</code> <a href="/api/data">/api/data</a></li>
        <li><code>GET</code> <a href="/api/health">/api/health</a></li>
        <li><code>GET</code> <a href="/api/viewers">/api/viewers</a></li>
        <li><code>WS</code> /ws</li>
    </ul>
</body>
</html>"#
    ))
}

/// Minimal HTML escaping for text placed in the status page.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `GET /api/data` -- the current full snapshot.
pub async fn get_data(State(state): State<Arc<AppState>>) -> Json<SnapshotView> {
    Json(state.store.to_view().await)
}

/// `GET /api/health`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}

/// `GET /api/viewers`
pub async fn viewers(State(state): State<Arc<AppState>>) -> Json<ViewerCount> {
    Json(ViewerCount {
        count: state.broadcaster.viewer_count().await,
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ObserverError {
    ObserverError::NotFound(uri.path().to_owned())
}
