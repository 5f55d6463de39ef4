//! Error types for the engine binary.
//!
//! Only configuration problems are fatal. A dashboard that fails to bind
//! is logged and the poll loop keeps running without it.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sia_core::config::ConfigError,
    },

    /// The configured tag API URL is unusable.
    #[error("tag API error: {source}")]
    TagApi {
        /// The underlying reader error.
        #[from]
        source: sia_core::tags::TagError,
    },
}
