//! Polling OHLCV candle cache.
//!
//! A single background [`refresh`] loop per tracked symbol pulls candles
//! from a market-data [`fetcher`] and merges them into a shared
//! [`store::SeriesStore`]. Any number of consumers read stable snapshots,
//! or a bounded text digest built by [`compress`], on their own schedules.

pub mod compress;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod refresh;
pub mod store;

pub use error::{FetchError, Result, TallowError};
