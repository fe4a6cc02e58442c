//! Exponentially weighted mean with span semantics.
//!
//! `alpha = 2 / (span + 1)`, recursive form (the non-adjusted definition):
//! `m[t] = alpha * x[t] + (1 - alpha) * m[t-1]`, seeded at the first finite
//! value. Leading NaNs produce NaN outputs; a NaN after the seed carries the
//! previous mean forward without updating it.

/// Exponentially weighted mean of `values` with the given span.
pub fn ewm_mean(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if span == 0 || n == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let Some(seed_idx) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    let mut mean = values[seed_idx];
    out[seed_idx] = mean;

    for i in (seed_idx + 1)..n {
        let x = values[i];
        if !x.is_nan() {
            mean = alpha * x + (1.0 - alpha) * mean;
        }
        out[i] = mean;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_first_value() {
        let m = ewm_mean(&[10.0, 10.0, 10.0], 3);
        assert_eq!(m, vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn matches_hand_computed_recursion() {
        // span 3 → alpha 0.5
        let m = ewm_mean(&[2.0, 4.0, 8.0], 3);
        assert!((m[0] - 2.0).abs() < 1e-12);
        assert!((m[1] - 3.0).abs() < 1e-12); // 0.5*4 + 0.5*2
        assert!((m[2] - 5.5).abs() < 1e-12); // 0.5*8 + 0.5*3
    }

    #[test]
    fn leading_nans_are_skipped() {
        let m = ewm_mean(&[f64::NAN, f64::NAN, 4.0, 8.0], 3);
        assert!(m[0].is_nan());
        assert!(m[1].is_nan());
        assert!((m[2] - 4.0).abs() < 1e-12);
        assert!((m[3] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn interior_nan_holds_state() {
        let m = ewm_mean(&[4.0, f64::NAN, 8.0], 3);
        assert!((m[1] - 4.0).abs() < 1e-12);
        assert!((m[2] - 6.0).abs() < 1e-12);
    }
}
