//! Simple and log period-over-period returns.

/// Simple returns: `r[t] = close[t] / close[t-1] - 1`. First element is NaN.
pub fn simple_returns(close: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    for i in 1..n {
        let prev = close[i - 1];
        let curr = close[i];
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            continue;
        }
        out[i] = curr / prev - 1.0;
    }
    out
}

/// Log returns: `r[t] = ln(close[t] / close[t-1])`. First element is NaN.
pub fn log_returns(close: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    for i in 1..n {
        let prev = close[i - 1];
        let curr = close[i];
        if prev.is_nan() || curr.is_nan() || prev <= 0.0 || curr <= 0.0 {
            continue;
        }
        out[i] = (curr / prev).ln();
    }
    out
}
