//! Sample moments. All variance-like quantities use ddof = 1.

/// Arithmetic mean. Empty input yields NaN.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1). Fewer than two observations yield NaN.
pub fn var_sample(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n as f64 - 1.0)
}

/// Sample standard deviation (ddof = 1).
pub fn std_sample(values: &[f64]) -> f64 {
    var_sample(values).sqrt()
}

/// Sample covariance (ddof = 1) of two equal-length series.
pub fn cov_sample(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (n as f64 - 1.0)
}
