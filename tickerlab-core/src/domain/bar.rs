//! Bar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV observation for a single instrument at a single timestamp.
///
/// Timestamps are timezone-naive by contract: providers normalize to a single
/// naive representation before bars enter the system. Volume is carried as
/// `f64` because the store schema is all-floating-point and the cleaning pass
/// may interpolate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub adj_close: Option<f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn has_gaps(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, prices positive, open/close
    /// inside the high/low envelope.
    pub fn is_sane(&self) -> bool {
        if self.has_gaps() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
