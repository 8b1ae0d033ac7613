// src/error.rs

//! Unified error handling for the sync tool and the catalog.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for anisync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream answered 429
    #[error("Rate limited by upstream (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP request failed (timeout, connection reset, DNS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status other than 429
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be understood
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// GraphQL `errors` array was present
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// No synced artifact exists for the requested year
    #[error("No local artifact for year {year}")]
    LocalArtifactMissing { year: i32 },

    /// Every season of a live year fetch failed
    #[error("All seasons failed for {year}: {last}")]
    AllSeasonsFailed { year: i32, last: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::MalformedResponse(message.to_string())
    }

    /// Whether the retry executor may try the operation again.
    ///
    /// Rate limits, transport failures and bad statuses are transient.
    /// Everything else (unparsable payloads, GraphQL errors, local I/O) is
    /// terminal for the call.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Http(_) | Self::Status { .. }
        )
    }

    /// Server-provided cooldown, if this is a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::RateLimited { retry_after: None }.is_transient());
        assert!(
            AppError::Status {
                status: 502,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!AppError::malformed("bad json").is_transient());
        assert!(!AppError::GraphQl("oops".into()).is_transient());
        assert!(!AppError::LocalArtifactMissing { year: 2024 }.is_transient());
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let err = AppError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(AppError::config("x").retry_after(), None);
    }
}
