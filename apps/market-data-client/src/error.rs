//! Error types for the market data access layer.
//!
//! One taxonomy covers the whole read path. The distinctions that matter
//! are encoded in [`DataError::is_retryable`]:
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | Network/transport failures | Validation errors |
//! | HTTP 5xx | Circuit open (fail fast) |
//! | HTTP 408/429 | Other HTTP 4xx |
//! | | Logical `error` field on a 2xx body |
//! | | Response parse failures |
//!
//! Retrying a circuit-open rejection would re-incur exactly the load the
//! breaker exists to shed, so it aborts the retry loop immediately.

use thiserror::Error;

/// Errors from the market data access layer.
#[derive(Debug, Error, Clone)]
pub enum DataError {
    /// Input rejected before any network activity.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Circuit breaker is open for the targeted endpoint.
    #[error("Circuit open for endpoint '{endpoint}'")]
    CircuitOpen {
        /// Endpoint whose circuit rejected the call.
        endpoint: String,
    },

    /// Network or transport failure (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the API.
    #[error("API returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, if any.
        message: String,
    },

    /// Logical failure: a successful-looking response carried an `error` field.
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be parsed.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Whether the retry loop should attempt this operation again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (*status >= 500 && *status < 600)
            }
            Self::Validation(_)
            | Self::CircuitOpen { .. }
            | Self::Api(_)
            | Self::Parse(_)
            | Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
