//! Application configuration loaded from environment variables.
//!
//! The provider token **must** be provided via `BITQUERY_TOKEN`. Everything
//! else has a default and can be overridden:
//! - `BITQUERY_URL`, `BITQUERY_NETWORK`
//! - `TALLOW_SYMBOL`, `TALLOW_QUOTE_TOKEN`, `TALLOW_BUCKET`
//! - `TALLOW_REFRESH_SECS`, `TALLOW_INITIAL_LIMIT`, `TALLOW_INCREMENTAL_LIMIT`,
//!   `TALLOW_FETCH_TIMEOUT_SECS`
//! - `TALLOW_COMPRESS_WINDOW`, `TALLOW_MAX_CANDLES`
//!
//! Empty values are treated as absent.

use std::str::FromStr;
use std::time::Duration;

use crate::TallowError;
use crate::compress::DEFAULT_COMPRESS_WINDOW;
use crate::fetcher::bitquery::Bucket;
use crate::refresh::RefreshSettings;

/// Default Bitquery streaming endpoint.
const DEFAULT_BITQUERY_URL: &str = "https://streaming.bitquery.io/graphql";

const DEFAULT_NETWORK: &str = "base";

/// AIXBT on Base.
const DEFAULT_SYMBOL: &str = "0x4F9Fd6Be4a90f2620860d680c0d4d5Fb53d1A825";

/// Wrapped ETH on Base.
const DEFAULT_QUOTE_TOKEN: &str = "0x4200000000000000000000000000000000000006";

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// Token address whose candles are tracked.
    pub symbol: String,
    pub bitquery: BitqueryConfig,
    pub refresh: RefreshSettings,
    pub cache: CacheConfig,
}

/// Bitquery-specific configuration values.
#[derive(Debug, Clone)]
pub struct BitqueryConfig {
    pub url: String,
    pub token: String,
    pub network: String,
    pub quote_token: String,
    pub bucket: Bucket,
    pub fetch_timeout: Duration,
}

/// Snapshot and retention settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub compress_window: usize,
    pub max_candles: Option<usize>,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`TallowError::Config`] if `BITQUERY_TOKEN` is missing, a numeric
/// value cannot be parsed, or an interval, limit or window is zero.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let token = non_empty_var("BITQUERY_TOKEN")
        .ok_or_else(|| TallowError::Config("BITQUERY_TOKEN is not set".to_string()))?;

    let fetch_timeout = Duration::from_secs(positive_var("TALLOW_FETCH_TIMEOUT_SECS", 30)?);
    let bucket = parsed_var("TALLOW_BUCKET", Bucket::default())?;

    let refresh = RefreshSettings {
        interval: Duration::from_secs(positive_var("TALLOW_REFRESH_SECS", 300)?),
        initial_limit: positive_var("TALLOW_INITIAL_LIMIT", 100)?,
        incremental_limit: positive_var("TALLOW_INCREMENTAL_LIMIT", 10)?,
        fetch_timeout,
    };

    let cache = CacheConfig {
        compress_window: positive_var("TALLOW_COMPRESS_WINDOW", DEFAULT_COMPRESS_WINDOW)?,
        max_candles: match non_empty_var("TALLOW_MAX_CANDLES") {
            Some(_) => Some(positive_var("TALLOW_MAX_CANDLES", 0)?),
            None => None,
        },
    };

    Ok(AppConfig {
        symbol: non_empty_var("TALLOW_SYMBOL").unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        bitquery: BitqueryConfig {
            url: non_empty_var("BITQUERY_URL").unwrap_or_else(|| DEFAULT_BITQUERY_URL.to_string()),
            token,
            network: non_empty_var("BITQUERY_NETWORK")
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            quote_token: non_empty_var("TALLOW_QUOTE_TOKEN")
                .unwrap_or_else(|| DEFAULT_QUOTE_TOKEN.to_string()),
            bucket,
            fetch_timeout,
        },
        refresh,
        cache,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses an optional variable, falling back to `default` when absent.
fn parsed_var<T>(name: &str, default: T) -> crate::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TallowError::Config(format!("invalid {name}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// Like [`parsed_var`] for counts and durations that must be non-zero.
fn positive_var<T>(name: &str, default: T) -> crate::Result<T>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parsed_var(name, default)?;
    if value == T::default() {
        return Err(TallowError::Config(format!("{name} must be positive")));
    }
    Ok(value)
}
