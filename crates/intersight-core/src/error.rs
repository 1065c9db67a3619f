//! Error types for device claim operations.
//!
//! This module provides the shared error type for the device connector and
//! management-service clients, including HTTP status classification.

use thiserror::Error;

/// Main error type for claim operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Login did not yield a usable device session
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API call failed with a non-success status
    #[error("{op} {uri} {status}")]
    Api {
        /// HTTP method of the failed call
        op: String,
        /// Target resource locator
        uri: String,
        /// Response status code
        status: u16,
    },

    /// Response had a success status but not the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation kind the request executor does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Retry/poll attempts exhausted without reaching the desired state
    #[error("State convergence timed out: {0}")]
    Convergence(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Endpoint is unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for claim operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::Api { .. } => "API_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            Self::Convergence(_) => "CONVERGENCE_TIMEOUT",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// Returns true for server-side (5xx) failures that the request
    /// executor retries before surfacing.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500 && *status < 600)
    }

    /// Construct an API error from the parts of a failed call.
    #[must_use]
    pub fn api(op: impl Into<String>, uri: impl Into<String>, status: u16) -> Self {
        Self::Api {
            op: op.into(),
            uri: uri.into(),
            status,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
