//! Indicator library: pure functions from price series to derived series.
//!
//! Conventions shared by every indicator:
//! - Input slices are assumed sorted ascending in time.
//! - Outputs have the same length as the input; `f64::NAN` marks warm-up
//!   rows (and rows whose inputs were NaN).
//! - Rolling statistics require a full window (minimum periods = window);
//!   exponential statistics use span semantics, alpha = 2/(span+1).

pub mod atr;
pub mod bollinger;
pub mod ewm;
pub mod macd;
pub mod returns;
pub mod rolling;
pub mod rsi;
pub mod volatility;

pub use atr::{atr, true_range};
pub use bollinger::bollinger;
pub use ewm::ewm_mean;
pub use macd::macd;
pub use returns::{log_returns, simple_returns};
pub use rolling::{rolling_mean, rolling_std};
pub use rsi::rsi;
pub use volatility::volatility;
