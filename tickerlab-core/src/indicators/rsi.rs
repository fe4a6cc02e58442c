//! Relative Strength Index (RSI), exponential-span variant.
//!
//! Up and down moves are smoothed with `ewm_mean(span = window)` rather than
//! Wilder's 1/n smoothing. RS = avg_up / avg_down,
//! RSI = 100 - 100 / (1 + RS).
//!
//! Edge cases: all-loss history → RSI 0; all-gain history → RSI 100 (the
//! division by a zero avg_down runs through +inf and lands exactly on 100).
//! A completely flat history is 0/0 and stays NaN.

use super::ewm::ewm_mean;

/// RSI over `window` (exponential span). Index 0 is NaN (no prior close).
pub fn rsi(close: &[f64], window: usize) -> Vec<f64> {
    let n = close.len();
    let mut up = vec![f64::NAN; n];
    let mut down = vec![f64::NAN; n];
    for i in 1..n {
        let prev = close[i - 1];
        let curr = close[i];
        if prev.is_nan() || curr.is_nan() {
            continue;
        }
        let delta = curr - prev;
        up[i] = delta.max(0.0);
        down[i] = (-delta).max(0.0);
    }

    let avg_up = ewm_mean(&up, window);
    let avg_down = ewm_mean(&down, window);

    avg_up
        .iter()
        .zip(&avg_down)
        .map(|(u, d)| {
            let rs = u / d;
            100.0 - 100.0 / (1.0 + rs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_rise_is_100() {
        let close: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let r = rsi(&close, 14);
        assert!(r[0].is_nan());
        assert!((r[19] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn monotonic_fall_is_0() {
        let close: Vec<f64> = (1..=20).rev().map(|i| i as f64).collect();
        let r = rsi(&close, 14);
        assert!(r[19].abs() < 1e-9);
    }

    #[test]
    fn output_is_bounded() {
        let close = [
            100.0, 101.5, 99.8, 102.3, 101.1, 103.7, 102.9, 104.2, 103.8, 105.0, 104.1, 106.3,
            105.7, 107.2, 106.8,
        ];
        for v in rsi(&close, 14) {
            if v.is_nan() {
                continue;
            }
            assert!((0.0..=100.0).contains(&v), "RSI out of bounds: {v}");
        }
    }

    #[test]
    fn flat_series_is_undefined() {
        let close = [5.0; 10];
        let r = rsi(&close, 4);
        assert!(r[9].is_nan());
    }
}
