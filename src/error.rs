//! Crate-level error types.
//!
//! [`FetchError`] covers everything that can go wrong while pulling candles
//! from the market-data provider. The refresh loop contains these locally;
//! they never reach snapshot readers. [`TallowError`] unifies the outer
//! surfaces (configuration, client construction) so the binary can use `?`.

use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TallowError>;

/// Top-level error type returned by configuration and setup APIs.
#[derive(Debug, thiserror::Error)]
pub enum TallowError {
    /// An environment variable was missing or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single provider round trip.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    /// The round trip did not finish within the configured bound.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The provider reported query errors in the response body.
    #[error("provider error: {0}")]
    Provider(String),

    /// The payload was structurally invalid (missing fields, wrong types).
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Returns `true` if the provider answered but the payload was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, FetchError::Malformed(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_are_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let fetch: FetchError = err.into();
        assert!(fetch.is_malformed());
    }

    #[test]
    fn timeout_is_not_malformed() {
        let err = FetchError::Timeout(Duration::from_secs(30));
        assert!(!err.is_malformed());
        assert_eq!(err.to_string(), "fetch timed out after 30s");
    }

    #[test]
    fn status_display_includes_code() {
        let err = FetchError::Status { status: 502 };
        assert_eq!(err.to_string(), "provider returned HTTP 502");
    }
}
