//! Pipeline facade: one config struct wiring sync → features → estimator.

use crate::analytics::{alpha_beta, AlphaBetaEstimate, DEFAULT_ERROR_TOLERANCE};
use crate::data::{
    sync_bars, BarStore, MarketDataProvider, StoreError, SymbolStatus, SyncError, SyncRequest,
};
use crate::domain::Interval;
use crate::features::{build_features, FeatureConfig};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("config file error: {0}")]
    ConfigFile(String),
}

/// Full pipeline run configuration. Loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default = "default_true")]
    pub fill_missing: bool,
    #[serde(default)]
    pub include_options: bool,
    pub store_dir: PathBuf,
    /// Where feature CSVs go; `None` keeps feature tables in memory only.
    #[serde(default)]
    pub features_dir: Option<PathBuf>,
    #[serde(default)]
    pub features: FeatureConfig,
}

fn default_interval() -> Interval {
    Interval::Daily
}

fn default_true() -> bool {
    true
}

impl PipelineConfig {
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ConfigFile(format!("{}: {e}", path.display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| PipelineError::ConfigFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.symbols.is_empty() {
            return Err(PipelineError::Config("no symbols configured".into()));
        }
        if self.end < self.start {
            return Err(PipelineError::Config(format!(
                "end {} precedes start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    fn start_ts(&self) -> NaiveDateTime {
        self.start.and_hms_opt(0, 0, 0).unwrap()
    }

    fn end_ts(&self) -> NaiveDateTime {
        self.end.and_hms_opt(23, 59, 59).unwrap()
    }
}

/// Outcome for one instrument in a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    /// Features built (and written, when a destination is configured).
    Ok {
        rows: usize,
        artifact: Option<PathBuf>,
    },
    /// Source had nothing for this instrument.
    NoData,
    /// Fetch or feature build failed; the rest of the batch continued.
    Failed(String),
}

/// Per-instrument report of a pipeline run. Partial failure is a normal
/// outcome — callers inspect this instead of getting all-or-nothing.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: BTreeMap<String, InstrumentOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, InstrumentOutcome::Ok { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, InstrumentOutcome::Failed(_)))
            .count()
    }
}

/// The pipeline: a validated config, a store, and a provider.
pub struct Pipeline {
    config: PipelineConfig,
    store: BarStore,
    provider: Box<dyn MarketDataProvider>,
}

impl Pipeline {
    /// Configuration errors are fatal here, at construction.
    pub fn new(
        config: PipelineConfig,
        provider: Box<dyn MarketDataProvider>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = BarStore::new(&config.store_dir);
        Ok(Self {
            config,
            store,
            provider,
        })
    }

    pub fn store(&self) -> &BarStore {
        &self.store
    }

    /// Sync bars, then build (and optionally persist) features per
    /// instrument. One instrument's failure never stops the others.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let request = SyncRequest {
            symbols: self.config.symbols.clone(),
            start: self.config.start_ts(),
            end: self.config.end_ts(),
            interval: self.config.interval,
            fill_missing: self.config.fill_missing,
            include_options: self.config.include_options,
        };
        let sync = sync_bars(self.provider.as_ref(), &self.store, &request)?;

        let mut outcomes = BTreeMap::new();
        for (symbol, status) in &sync.statuses {
            match status {
                SymbolStatus::NoData => {
                    outcomes.insert(symbol.clone(), InstrumentOutcome::NoData);
                    continue;
                }
                SymbolStatus::Failed(reason) => {
                    outcomes.insert(symbol.clone(), InstrumentOutcome::Failed(reason.clone()));
                    continue;
                }
                SymbolStatus::FromStore | SymbolStatus::Fetched => {}
            }
            let bars = &sync.data[symbol];
            if bars.is_empty() {
                warn!(%symbol, "empty bar table, skipping features");
                outcomes.insert(symbol.clone(), InstrumentOutcome::NoData);
                continue;
            }

            let frame = build_features(symbol, bars, &self.config.features);
            let outcome = match &self.config.features_dir {
                Some(dir) => match frame.write_csv(dir) {
                    Ok(path) => {
                        info!(%symbol, artifact = %path.display(), "features written");
                        InstrumentOutcome::Ok {
                            rows: frame.height(),
                            artifact: Some(path),
                        }
                    }
                    Err(e) => {
                        warn!(%symbol, error = %e, "feature write failed");
                        InstrumentOutcome::Failed(e.to_string())
                    }
                },
                None => InstrumentOutcome::Ok {
                    rows: frame.height(),
                    artifact: None,
                },
            };
            outcomes.insert(symbol.clone(), outcome);
        }

        Ok(RunReport { outcomes })
    }

    /// Estimate alpha/beta of `subject` against `benchmark` from stored
    /// closes. Degenerate inputs log a reason and yield `None`.
    pub fn alpha_beta(
        &self,
        benchmark: &str,
        subject: &str,
        error_tolerance: Option<f64>,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Option<AlphaBetaEstimate>, PipelineError> {
        let (start, end) = match date_range {
            Some((s, e)) => (
                s.and_hms_opt(0, 0, 0).unwrap(),
                e.and_hms_opt(23, 59, 59).unwrap(),
            ),
            None => (self.config.start_ts(), self.config.end_ts()),
        };
        let interval = self.config.interval;

        let bench_bars = self
            .store
            .read_range(benchmark, interval, Some(start), Some(end))?;
        let subj_bars = self
            .store
            .read_range(subject, interval, Some(start), Some(end))?;

        // Intersect the two timestamp axes (both are sorted).
        let mut bench_close = Vec::new();
        let mut subj_close = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < bench_bars.len() && j < subj_bars.len() {
            match bench_bars[i].ts.cmp(&subj_bars[j].ts) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    bench_close.push(bench_bars[i].close);
                    subj_close.push(subj_bars[j].close);
                    i += 1;
                    j += 1;
                }
            }
        }

        let bench_returns = dense_returns(&bench_close);
        let subj_returns = dense_returns(&subj_close);
        let tolerance = error_tolerance.unwrap_or(DEFAULT_ERROR_TOLERANCE);

        match alpha_beta(&subj_returns, &bench_returns, interval, tolerance) {
            Ok(estimate) => Ok(Some(estimate)),
            Err(reason) => {
                warn!(
                    %benchmark, %subject, %reason,
                    "alpha/beta estimation declined"
                );
                Ok(None)
            }
        }
    }
}

/// Period returns without the leading NaN slot.
fn dense_returns(close: &[f64]) -> Vec<f64> {
    crate::indicators::simple_returns(close)
        .into_iter()
        .skip(1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::canonical_symbol;

    #[test]
    fn empty_symbol_list_is_a_config_error() {
        let config = PipelineConfig {
            symbols: vec![],
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            interval: Interval::Daily,
            fill_missing: true,
            include_options: false,
            store_dir: "store".into(),
            features_dir: None,
            features: FeatureConfig::default(),
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn inverted_range_is_a_config_error() {
        let config = PipelineConfig {
            symbols: vec!["SPY".into()],
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            interval: Interval::Daily,
            fill_missing: true,
            include_options: false,
            store_dir: "store".into(),
            features_dir: None,
            features: FeatureConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_parses_from_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            symbols = ["aapl", "MSFT"]
            start = "2023-01-01"
            end = "2023-10-01"
            interval = "1d"
            store_dir = "store"
            features_dir = "features"

            [features]
            ma_windows = [5, 20]
            "#,
        )
        .unwrap();
        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.interval, Interval::Daily);
        assert!(config.fill_missing);
        assert_eq!(config.features.ma_windows, vec![5, 20]);
        assert_eq!(canonical_symbol(&config.symbols[0]), "AAPL");
    }
}
