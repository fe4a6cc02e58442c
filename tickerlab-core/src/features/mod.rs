//! Feature pipeline: per-instrument indicator runs merged into one table.

pub mod builder;
pub mod merge;

pub use builder::build_features;
pub use merge::{merge_outer, FeatureError, FeatureFrame, FeatureSeries};

use serde::{Deserialize, Serialize};

/// Which indicators to run, and with which parameters.
///
/// An empty parameter list disables that indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub returns: bool,
    pub log_returns: bool,
    pub ma_windows: Vec<usize>,
    pub bb_windows: Vec<usize>,
    pub rsi_windows: Vec<usize>,
    pub macd_params: Vec<(usize, usize, usize)>,
    pub vol_windows: Vec<usize>,
    pub atr_windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            returns: true,
            log_returns: true,
            ma_windows: vec![5, 20, 50],
            bb_windows: vec![20],
            rsi_windows: vec![14],
            macd_params: vec![(12, 26, 9)],
            vol_windows: vec![10],
            atr_windows: vec![14],
        }
    }
}
