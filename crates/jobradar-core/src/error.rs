//! Error types for jobradar.

use thiserror::Error;

/// Result type alias using jobradar's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for jobradar operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Every credential in the dispatcher pool was exhausted within the
    /// retry budget. The only error the dispatcher maps to HTTP 429.
    #[error("All credentials exhausted. Please wait and try again.")]
    Exhausted,

    /// The provider signalled a per-credential rate limit (429 /
    /// RESOURCE_EXHAUSTED / quota). Consumed by the dispatcher's rotation
    /// logic; callers outside the dispatcher only ever see `Exhausted`.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Non-rate-limit provider failure (network, 5xx, malformed reply).
    #[error("Transport error: {0}")]
    Transport(String),

    /// LLM output failed schema, shape, or dimensionality validation.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database operation failed (wraps sqlx::Error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cache collaborator failure (best-effort paths log and ignore this).
    #[error("Cache error: {0}")]
    Cache(String),

    /// Raw-job log collaborator failure.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the provider signalled a per-credential rate limit.
    ///
    /// The dispatcher uses this to decide between cooling-and-rotating
    /// versus surfacing the error unchanged.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
