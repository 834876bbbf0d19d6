//! Market-data fetch boundary.
//!
//! The refresh loop only sees the [`Fetcher`] trait: give it a symbol and a
//! row limit, get back typed [`Candle`]s or a [`FetchError`]. Provider query
//! construction and response validation stay inside the implementations.

pub mod bitquery;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::candle::Candle;

/// Source of freshly observed candles for a symbol.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns up to `limit` of the most recent buckets for `symbol`, in any order.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure, non-2xx responses,
    /// provider-reported errors or malformed payloads.
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, FetchError>;
}
