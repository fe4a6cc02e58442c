//! Market data provider trait and structured error types.
//!
//! The `MarketDataProvider` trait abstracts over bar sources (CSV import,
//! remote APIs, mocks for tests). The store and the sync orchestrator sit
//! above this trait — providers know nothing about the cache.

use crate::domain::{Bar, Interval, OptionContract};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured error types for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("source I/O error: {0}")]
    Io(String),

    #[error("options chains not supported by provider '{provider}'")]
    OptionsUnsupported { provider: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for market data sources.
///
/// `fetch_bars` is batched: one call covers every symbol that needs data.
/// Unknown or delisted symbols MUST be omitted from the result map rather
/// than failing the whole batch.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch OHLCV bars for a batch of symbols over an inclusive date range.
    ///
    /// Timestamps in the returned bars are timezone-naive.
    fn fetch_bars(
        &self,
        symbols: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<BTreeMap<String, Vec<Bar>>, ProviderError>;

    /// Fetch the current options chain snapshot for one symbol.
    fn fetch_option_chain(&self, symbol: &str) -> Result<Vec<OptionContract>, ProviderError>;
}
