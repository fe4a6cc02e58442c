//! Rolling mean and rolling sample standard deviation.
//!
//! Minimum periods equal the window: the first `window - 1` outputs are NaN,
//! and any window containing a NaN yields NaN.

/// Simple rolling mean over `window` observations.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// Rolling sample standard deviation (ddof = 1) over `window` observations.
/// A window of 1 has no sample variance and yields NaN throughout.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let ss: f64 = slice.iter().map(|v| (v - mean) * (v - mean)).sum();
        out[i] = (ss / (window as f64 - 1.0)).sqrt();
    }
    out
}
