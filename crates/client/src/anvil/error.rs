//! World Anvil API client error types.

use anvil_core::Error;

/// Errors from the World Anvil API client.
#[derive(Debug, thiserror::Error)]
pub enum AnvilError {
    /// Application key or user token not configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid or unauthorized credentials (401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Resource not found (404).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Rate limited by World Anvil (429).
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Error status or a body carrying `success: false`.
    #[error("API error: {message}")]
    Api { status: Option<u16>, message: String },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Every attempt ended in a transport failure.
    #[error("request failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// Malformed cache invalidation pattern.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Granularity outside 0-3.
    #[error("invalid granularity {0}: must be 0-3")]
    InvalidGranularity(u8),

    /// Request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl AnvilError {
    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnvilError::Timeout | AnvilError::Transport(_))
    }
}

impl From<reqwest::Error> for AnvilError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { AnvilError::Timeout } else { AnvilError::Transport(err.to_string()) }
    }
}

impl From<Error> for AnvilError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidPattern(msg) => AnvilError::InvalidPattern(msg),
            other => AnvilError::Api { status: None, message: other.to_string() },
        }
    }
}

impl From<AnvilError> for Error {
    fn from(err: AnvilError) -> Self {
        match err {
            AnvilError::MissingCredentials(msg) => Error::NotConfigured(msg),
            AnvilError::Auth(msg) => Error::AuthFailed(msg),
            AnvilError::NotFound(msg) => Error::NotFound(msg),
            AnvilError::RateLimited { retry_after } => Error::RateLimited { retry_after },
            AnvilError::Api { status, message } => Error::ApiError { status, message },
            AnvilError::InvalidPattern(msg) => Error::InvalidPattern(msg),
            AnvilError::InvalidGranularity(_) => Error::InvalidInput(err.to_string()),
            AnvilError::Parse(_) | AnvilError::InvalidUrl(_) => {
                Error::ApiError { status: None, message: err.to_string() }
            }
            AnvilError::Timeout | AnvilError::Transport(_) | AnvilError::Exhausted { .. } => {
                Error::RequestFailed(err.to_string())
            }
        }
    }
}
