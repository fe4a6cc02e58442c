//! Realized volatility: rolling sample standard deviation of simple returns.

use super::returns::simple_returns;
use super::rolling::rolling_std;

/// Rolling std of period returns. The first `window` outputs are NaN (one
/// row lost to the return computation, `window - 1` to the rolling warm-up).
pub fn volatility(close: &[f64], window: usize) -> Vec<f64> {
    rolling_std(&simple_returns(close), window)
}
