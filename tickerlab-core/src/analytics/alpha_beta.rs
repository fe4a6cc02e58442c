//! Adaptive alpha/beta estimator.
//!
//! Regresses a subject return series against a benchmark, then sizes a
//! trailing estimation window from the classical standard-error-of-slope
//! formula so that the slope reaches a target relative precision:
//!
//! ```text
//! SE(beta) = sigma_eps / (sigma_m * sqrt(N))
//! =>  N = (sigma_eps / (sigma_m * target_SE))^2
//! ```
//!
//! The final beta/alpha are recomputed on the most recent N observations —
//! the trailing window, not the earliest — because the near-term
//! relationship is what the estimate is for.

use super::stats::{cov_sample, mean, std_sample, var_sample};
use crate::domain::Interval;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Default target relative standard error on beta.
pub const DEFAULT_ERROR_TOLERANCE: f64 = 0.20;

/// Overlaps below this many observations are rejected outright.
pub const MIN_OVERLAP: usize = 10;

/// Preferred lower bound on the estimation window. Relaxed to the overlap
/// length when the overlap itself is shorter (10..30 bars), so very short
/// histories remain analyzable.
pub const WINDOW_FLOOR: usize = 30;

/// |beta| is floored at this magnitude before the relative tolerance is
/// applied, so a near-zero slope doesn't explode the required sample size.
pub const BETA_MAGNITUDE_FLOOR: f64 = 0.01;

/// Degenerate inputs. These are expected outcomes in rolling analysis, not
/// failures — callers usually log the reason and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Degenerate {
    #[error("insufficient overlap: {overlap} bars, need at least 10")]
    InsufficientOverlap { overlap: usize },

    #[error("zero benchmark variance")]
    ZeroVariance,
}

/// Regression output. Deterministic: same inputs, bit-identical outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaBetaEstimate {
    /// Slope over the full overlap.
    pub beta_full: f64,
    /// Slope over the trailing adaptive window.
    pub beta_final: f64,
    /// Intercept of the trailing-window regression, per period.
    pub alpha_per_period: f64,
    /// Per-period alpha scaled by the interval's periods-per-year.
    pub alpha_annualized: f64,
    /// Trailing window actually used (post-clamp).
    pub n_bars_used: usize,
    /// Closed-form required sample size, before clamping.
    pub required_n: usize,
}

/// Estimate alpha and beta of `subject` against `benchmark`.
///
/// Both slices must be aligned period returns on the same timestamp axis;
/// if the lengths differ, the common prefix length is used.
pub fn alpha_beta(
    subject: &[f64],
    benchmark: &[f64],
    interval: Interval,
    error_tolerance: f64,
) -> Result<AlphaBetaEstimate, Degenerate> {
    let overlap = subject.len().min(benchmark.len());
    if overlap < MIN_OVERLAP {
        return Err(Degenerate::InsufficientOverlap { overlap });
    }
    if overlap < WINDOW_FLOOR {
        warn!(
            %overlap,
            "overlap below the {WINDOW_FLOOR}-bar floor, estimating on a reduced window"
        );
    }
    let subject = &subject[subject.len() - overlap..];
    let benchmark = &benchmark[benchmark.len() - overlap..];

    let var_m = var_sample(benchmark);
    if var_m == 0.0 {
        return Err(Degenerate::ZeroVariance);
    }

    // Full-sample regression
    let beta_full = cov_sample(subject, benchmark) / var_m;
    let intercept = mean(subject) - beta_full * mean(benchmark);
    let residuals: Vec<f64> = subject
        .iter()
        .zip(benchmark)
        .map(|(s, b)| s - (intercept + beta_full * b))
        .collect();
    let sigma_eps = std_sample(&residuals);
    let sigma_m = std_sample(benchmark);

    // Window sizing from the slope-SE formula
    let target_se = error_tolerance * beta_full.abs().max(BETA_MAGNITUDE_FLOOR);
    let required_n = (sigma_eps / (sigma_m * target_se)).powi(2).floor() as usize;
    let floor = WINDOW_FLOOR.min(overlap);
    let n_bars_used = required_n.clamp(floor, overlap);

    // Trailing-window regression
    let tail_s = &subject[overlap - n_bars_used..];
    let tail_b = &benchmark[overlap - n_bars_used..];
    let var_tail = var_sample(tail_b);
    let beta_final = if var_tail == 0.0 {
        // Degenerate tail of a non-degenerate overlap: fall back to the
        // full-sample slope rather than dividing by zero.
        beta_full
    } else {
        cov_sample(tail_s, tail_b) / var_tail
    };
    let alpha_per_period = mean(tail_s) - beta_final * mean(tail_b);
    let alpha_annualized = alpha_per_period * interval.periods_per_year();

    Ok(AlphaBetaEstimate {
        beta_full,
        beta_final,
        alpha_per_period,
        alpha_annualized,
        n_bars_used,
        required_n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-returns, bounded away from degeneracy.
    fn wavy(n: usize, scale: f64, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| scale * ((i as f64) * 0.7 + phase).sin())
            .collect()
    }

    #[test]
    fn perfect_linear_relation_recovers_beta_exactly() {
        let b = wavy(100, 0.01, 0.0);
        let s: Vec<f64> = b.iter().map(|x| 0.0005 + 1.5 * x).collect();
        let est = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        assert!((est.beta_full - 1.5).abs() < 1e-9);
        assert!((est.beta_final - 1.5).abs() < 1e-9);
        assert!((est.alpha_per_period - 0.0005).abs() < 1e-9);
        assert!((est.alpha_annualized - 0.0005 * 252.0).abs() < 1e-6);
        // No residual noise → tiny required N, clamped up to the floor.
        assert_eq!(est.n_bars_used, 30);
    }

    #[test]
    fn zero_variance_benchmark_is_degenerate() {
        let b = vec![0.0; 50];
        let s = wavy(50, 0.01, 0.3);
        assert_eq!(
            alpha_beta(&s, &b, Interval::Daily, 0.2),
            Err(Degenerate::ZeroVariance)
        );
    }

    #[test]
    fn five_bar_overlap_is_rejected() {
        let b = wavy(5, 0.01, 0.0);
        let s = wavy(5, 0.01, 1.0);
        assert_eq!(
            alpha_beta(&s, &b, Interval::Daily, 0.2),
            Err(Degenerate::InsufficientOverlap { overlap: 5 })
        );
    }

    #[test]
    fn short_overlap_relaxes_the_floor() {
        let b = wavy(15, 0.01, 0.0);
        let s: Vec<f64> = b.iter().map(|x| 1.2 * x).collect();
        let est = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        assert_eq!(est.n_bars_used, 15);
    }

    #[test]
    fn thirty_bar_overlap_uses_exactly_thirty() {
        let b = wavy(30, 0.01, 0.0);
        let s: Vec<f64> = b.iter().map(|x| 1.2 * x).collect();
        let est = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        assert_eq!(est.n_bars_used, 30);
    }

    #[test]
    fn window_never_exceeds_overlap() {
        // Heavy noise relative to signal → huge required N.
        let b = wavy(60, 0.0001, 0.0);
        let s: Vec<f64> = b
            .iter()
            .enumerate()
            .map(|(i, x)| x + 0.05 * ((i as f64) * 1.3).cos())
            .collect();
        let est = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        assert!(est.required_n > 60);
        assert_eq!(est.n_bars_used, 60);
    }

    #[test]
    fn looser_tolerance_requires_fewer_bars() {
        let b = wavy(200, 0.01, 0.0);
        let s: Vec<f64> = b
            .iter()
            .enumerate()
            .map(|(i, x)| 1.5 * x + 0.005 * ((i as f64) * 2.1).sin())
            .collect();
        let tight = alpha_beta(&s, &b, Interval::Daily, 0.05).unwrap();
        let loose = alpha_beta(&s, &b, Interval::Daily, 0.40).unwrap();
        assert!(tight.required_n > loose.required_n);
    }

    #[test]
    fn weekly_annualization_uses_52() {
        let b = wavy(100, 0.01, 0.0);
        let s: Vec<f64> = b.iter().map(|x| 0.001 + x).collect();
        let est = alpha_beta(&s, &b, Interval::Weekly, 0.2).unwrap();
        assert!((est.alpha_annualized - est.alpha_per_period * 52.0).abs() < 1e-12);
    }

    #[test]
    fn results_are_reproducible_bit_for_bit() {
        let b = wavy(150, 0.01, 0.2);
        let s: Vec<f64> = b
            .iter()
            .enumerate()
            .map(|(i, x)| 1.1 * x + 0.002 * ((i as f64) * 1.7).cos())
            .collect();
        let a = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        let b2 = alpha_beta(&s, &b, Interval::Daily, 0.2).unwrap();
        assert_eq!(a, b2);
    }
}
