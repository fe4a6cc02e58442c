//! Bollinger bands: rolling mean ± 2 rolling sample standard deviations.

use super::rolling::{rolling_mean, rolling_std};

/// Upper and lower Bollinger bands for the given window.
/// Warm-up rows (first `window - 1`) are NaN in both bands.
pub fn bollinger(close: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let mean = rolling_mean(close, window);
    let std = rolling_std(close, window);
    let upper = mean
        .iter()
        .zip(&std)
        .map(|(m, s)| m + 2.0 * s)
        .collect();
    let lower = mean
        .iter()
        .zip(&std)
        .map(|(m, s)| m - 2.0 * s)
        .collect();
    (upper, lower)
}
