//! Statistical analytics: sample-moment helpers and the adaptive
//! alpha/beta estimator.

pub mod alpha_beta;
pub mod stats;

pub use alpha_beta::{alpha_beta, AlphaBetaEstimate, Degenerate, DEFAULT_ERROR_TOLERANCE};
pub use stats::{cov_sample, mean, std_sample, var_sample};
