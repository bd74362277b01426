//! Unified error types for world-anvil-mcp.
//!
//! Every tool failure is funnelled through [`Error`] so the MCP layer sees a
//! stable code and message regardless of which crate produced it.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the world-anvil-mcp server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty world id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// API credentials are not configured.
    #[error("NOT_CONFIGURED: {0}")]
    NotConfigured(String),

    /// World Anvil rejected the credentials (401/403).
    #[error("AUTH_FAILED: {0}")]
    AuthFailed(String),

    /// Requested resource does not exist (404).
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Rate limited by World Anvil (429).
    #[error("RATE_LIMITED: retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// Any other API failure, including `success: false` bodies.
    #[error("API_ERROR: {message}")]
    ApiError { status: Option<u16>, message: String },

    /// Transport failures exhausted the retry budget.
    #[error("REQUEST_FAILED: {0}")]
    RequestFailed(String),

    /// Malformed cache invalidation expression.
    #[error("INVALID_PATTERN: {0}")]
    InvalidPattern(String),

    /// Output could not be serialized.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::NotConfigured(_) => -32000,
            Error::AuthFailed(_) => -32001,
            Error::NotFound(_) => -32002,
            Error::RateLimited { .. } => -32003,
            Error::ApiError { .. } => -32004,
            Error::RequestFailed(_) => -32005,
            Error::InvalidPattern(_) => -32006,
            Error::Serialization(_) => -32603,
        };

        let data = match &err {
            Error::RateLimited { retry_after } => Some(serde_json::json!({ "retry_after": retry_after })),
            Error::ApiError { status: Some(status), .. } => Some(serde_json::json!({ "status": status })),
            _ => None,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data }
    }
}
