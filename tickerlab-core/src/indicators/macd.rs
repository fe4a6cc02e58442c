//! MACD: fast EWM minus slow EWM, plus a signal line.

use super::ewm::ewm_mean;

/// MACD line and signal line for (fast, slow, signal) spans.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>) {
    let ema_fast = ewm_mean(close, fast);
    let ema_slow = ewm_mean(close, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ewm_mean(&line, signal);
    (line, signal_line)
}
