//! Error types for the query client.

use std::time::Duration;

/// Query client errors.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Token endpoint rejected the credentials.
    #[error("failed to authenticate: {message}")]
    Authentication { message: String },

    /// Session token was rejected by the query endpoint.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure or server error (timeouts, resets, 5xx).
    #[error("network error: {message}")]
    Network { message: String },

    /// The API rejected the request (bad query, missing object, ...).
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A response payload lacked an expected field or was not JSON.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Snapshot cache read or write failed.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Configuration missing or invalid.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl QueryError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,

            Self::Authentication { .. } => 3,
            Self::Unauthorized { .. } => 3,

            Self::RateLimited { .. } => 4,
            Self::Network { .. } => 4,
            Self::Api { .. } => 4,

            Self::MalformedResponse { .. } => 5,
            Self::Cache { .. } => 5,
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        Self::Network { message }
    }
}

/// Result type for query client operations.
pub type QueryResult<T> = Result<T, QueryError>;
