//! Tag readers: the boundary to the external controller applications.
//!
//! A tag is a named scalar owned by one application, addressed by the
//! pair (tag name, app key). The poller only ever asks one question --
//! "what is tag X on app Y right now?" -- and treats any failure of that
//! call as the fault boundary.
//!
//! Readers use enum dispatch instead of trait objects because async
//! methods are not dyn-compatible.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::trace;

use crate::config::SourcesConfig;

/// Errors a tag read can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The application does not expose the tag (or has no value for it).
    #[error("tag `{tag}` not found on app `{app_key}`")]
    NotFound {
        /// The owning application.
        app_key: String,
        /// The tag that was requested.
        tag: String,
    },

    /// The tag API could not be reached.
    #[error("tag API request failed: {0}")]
    Request(String),

    /// The tag API answered with a non-success status.
    #[error("tag API returned {status} for `{tag}` on `{app_key}`")]
    Status {
        /// The owning application.
        app_key: String,
        /// The tag that was requested.
        tag: String,
        /// HTTP status code.
        status: u16,
    },

    /// The tag API answered with something other than a scalar.
    #[error("tag API response was not a scalar: {0}")]
    Malformed(String),

    /// The configured tag API URL cannot address tags.
    #[error("invalid tag API URL `{0}`")]
    InvalidBaseUrl(String),

    /// No tag API is configured.
    #[error("no tag API configured")]
    NoUpstream,
}

/// A scalar tag value as returned by an application.
#[derive(Debug, Clone, PartialEq)]
pub struct TagValue(Value);

impl TagValue {
    /// Interpret the value as a number. Numeric strings are accepted.
    pub fn as_number(&self) -> Option<f64> {
        match &self.0 {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|v: &f64| v.is_finite())
    }

    /// Interpret the value as text. Numbers and booleans are stringified.
    pub fn as_text(&self) -> Option<String> {
        match &self.0 {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The raw JSON value.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for TagValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A source of tag values.
#[derive(Debug, Clone)]
pub enum TagReader {
    /// Reads tags from the HTTP tag API.
    Http(HttpTagReader),
    /// Serves tags from an in-memory table.
    Fixed(FixedTagReader),
    /// No upstream at all. Every read fails with [`TagError::NoUpstream`].
    Offline,
}

impl TagReader {
    /// The reader the engine uses for `sources`: HTTP when a tag API URL
    /// is configured, [`TagReader::Offline`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::InvalidBaseUrl`] if the URL does not parse.
    pub fn from_config(sources: &SourcesConfig) -> Result<Self, TagError> {
        match &sources.tag_api_url {
            Some(url) => HttpTagReader::new(url).map(Self::Http),
            None => Ok(Self::Offline),
        }
    }

    /// Whether this reader has no upstream to ask.
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// Read one tag from its owning application.
    ///
    /// # Errors
    ///
    /// Returns [`TagError`] if the tag is missing or the application
    /// cannot be reached.
    pub async fn get_tag(&self, tag: &str, app_key: &str) -> Result<TagValue, TagError> {
        match self {
            Self::Http(reader) => reader.get_tag(tag, app_key).await,
            Self::Fixed(reader) => reader.get_tag(tag, app_key).await,
            Self::Offline => Err(TagError::NoUpstream),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Http(_) => "http",
            Self::Fixed(_) => "fixed",
            Self::Offline => "offline",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP tag API
// ---------------------------------------------------------------------------

/// Reader for the HTTP tag API.
///
/// Sends `GET {base_url}/apps/{app_key}/tags/{tag}` and accepts either a
/// bare JSON scalar or an object with a `value` member. The app key and
/// tag are percent-encoded as single path segments.
#[derive(Debug, Clone)]
pub struct HttpTagReader {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTagReader {
    /// Create a reader for the tag API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute URL that can carry a path.
    pub fn new(base_url: &str) -> Result<Self, TagError> {
        let invalid = || TagError::InvalidBaseUrl(base_url.to_owned());
        let url = Url::parse(base_url).map_err(|_| invalid())?;
        if url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url,
        })
    }

    fn tag_url(&self, app_key: &str, tag: &str) -> Result<Url, TagError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TagError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["apps", app_key, "tags", tag]);
        Ok(url)
    }

    async fn get_tag(&self, tag: &str, app_key: &str) -> Result<TagValue, TagError> {
        let url = self.tag_url(app_key, tag)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TagError::Request(format!("GET {url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TagError::NotFound {
                app_key: app_key.to_owned(),
                tag: tag.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(TagError::Status {
                app_key: app_key.to_owned(),
                tag: tag.to_owned(),
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TagError::Malformed(format!("GET {url}: {e}")))?;
        trace!(%url, %body, "tag API response");

        extract_scalar(body).map(TagValue).ok_or_else(|| TagError::NotFound {
            app_key: app_key.to_owned(),
            tag: tag.to_owned(),
        })
    }
}

/// Pull the scalar out of a tag API body. `null` means "no value".
fn extract_scalar(body: Value) -> Option<Value> {
    let value = match body {
        Value::Object(mut map) => map.remove("value")?,
        other => other,
    };
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        scalar => Some(scalar),
    }
}

// ---------------------------------------------------------------------------
// In-memory reader
// ---------------------------------------------------------------------------

/// Reader that serves tags from a fixed table.
///
/// Used in tests and offline simulation. Unknown tags fail
/// with [`TagError::NotFound`]. An optional artificial latency lets tests
/// exercise the poller's read timeout.
#[derive(Debug, Clone, Default)]
pub struct FixedTagReader {
    tags: BTreeMap<(String, String), Value>,
    latency: Option<Duration>,
}

impl FixedTagReader {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a tag value.
    #[must_use]
    pub fn with_tag(mut self, app_key: &str, tag: &str, value: impl Into<Value>) -> Self {
        self.tags
            .insert((app_key.to_owned(), tag.to_owned()), value.into());
        self
    }

    /// Delay every read by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn get_tag(&self, tag: &str, app_key: &str) -> Result<TagValue, TagError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.tags
            .get(&(app_key.to_owned(), tag.to_owned()))
            .cloned()
            .map(TagValue)
            .ok_or_else(|| TagError::NotFound {
                app_key: app_key.to_owned(),
                tag: tag.to_owned(),
            })
    }
}
