//! Average True Range (ATR), simple-rolling-mean variant.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! bar has no previous close and uses high-low alone. ATR is a plain rolling
//! mean of the TR series (not Wilder smoothing).

/// True Range series.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    debug_assert_eq!(low.len(), n);
    debug_assert_eq!(close.len(), n);
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }

    if !high[0].is_nan() && !low[0].is_nan() {
        tr[0] = high[0] - low[0];
    }
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() {
            continue;
        }
        tr[i] = if pc.is_nan() {
            h - l
        } else {
            (h - l).max((h - pc).abs()).max((l - pc).abs())
        };
    }
    tr
}

/// ATR over `window`: rolling mean of the true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Vec<f64> {
    super::rolling::rolling_mean(&true_range(high, low, close), window)
}
