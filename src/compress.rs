//! Bounded text digest of a candle series.
//!
//! Consumers feed the digest into prompts and logs, so it stays small: only
//! the newest few candles, one line each, oldest first.

use std::fmt::Write;

use crate::models::candle::{Candle, Series};

/// Number of candles kept by [`compress`] when callers do not choose.
pub const DEFAULT_COMPRESS_WINDOW: usize = 20;

/// Returned in place of a digest when a symbol has no cached candles.
pub const NO_DATA_MARKER: &str = "no data available";

/// Renders the newest `window` candles of `series`, one per line.
///
/// `None` and empty series both render as [`NO_DATA_MARKER`].
pub fn compress(series: Option<&Series>, window: usize) -> String {
    let Some(series) = series.filter(|s| !s.is_empty()) else {
        return NO_DATA_MARKER.to_string();
    };

    let mut out = String::new();
    for (i, candle) in series.tail(window).iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_line(&mut out, candle);
    }
    out
}

fn write_line(out: &mut String, candle: &Candle) {
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "{} open={} high={} low={} close={} volume={}",
        candle.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        candle.open.normalize(),
        candle.high.normalize(),
        candle.low.normalize(),
        candle.close.normalize(),
        candle.volume.normalize(),
    );
}
