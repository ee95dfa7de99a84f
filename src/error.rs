// Error types for the hubcache library.
// Covers store failures, cache generation failures, and configuration errors.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Generation for '{key}' timed out after {timeout:?}")]
    GenerationTimeout { key: String, timeout: Duration },

    #[error("Generation for '{key}' failed: {source}")]
    GenerationFailed {
        key: String,
        #[source]
        source: Arc<HubError>,
    },

    #[error("Generation for '{key}' aborted: {message}")]
    GenerationAborted { key: String, message: String },

    #[error("Cached value for '{key}' has a different type")]
    CacheTypeMismatch { key: String },

    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Method '{0}' requires an argument")]
    MissingArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, HubError>;
