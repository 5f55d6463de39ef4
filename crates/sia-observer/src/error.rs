//! Error types for the dashboard server.
//!
//! [`ObserverError`] covers both HTTP failures and rejected viewer
//! commands. Over HTTP it converts into a JSON response via
//! [`IntoResponse`]; over the duplex channel its message becomes the
//! payload of an `error` event.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the dashboard server.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// No route matched the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// A viewer message was not a valid command.
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] serde_json::Error),

    /// A well-formed command carried an unacceptable value.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl ObserverError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MalformedCommand(_) | Self::InvalidCommand(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
