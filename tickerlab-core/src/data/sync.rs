//! Cache-aware sync orchestrator.
//!
//! Given symbols and a requested [start, end] range, serves every symbol the
//! store already covers straight from disk and batches the rest into a
//! single provider call. Fetched frames are cleaned, upserted into the
//! store, and merged into the in-memory result.
//!
//! Fetch policy: a request is a cache hit only when the stored range spans
//! it — stored min at-or-before the requested start, stored max no more than
//! a one-day grace buffer before the requested end. A miss re-fetches the
//! whole requested range (no edge gap-fill).

use super::clean::clean_bars;
use super::provider::{MarketDataProvider, ProviderError};
use super::store::{BarStore, StoreError};
use crate::domain::{canonical_symbol, Bar, Interval};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Retry envelope around external calls: 3 attempts, doubling delay.
pub const FETCH_ATTEMPTS: u32 = 3;
const FETCH_BASE_DELAY: Duration = Duration::from_millis(500);

/// Requested end may exceed stored coverage by this much and still count as
/// covered (today's bar often isn't closed yet).
const COVERAGE_GRACE_DAYS: i64 = 1;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a sync run did for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolStatus {
    /// Requested range was already covered; served from the store.
    FromStore,
    /// Fetched from the provider and upserted.
    Fetched,
    /// Provider had nothing for this symbol (unknown, delisted, or empty).
    NoData,
    /// Provider call failed after retries.
    Failed(String),
}

/// One sync request: symbols, range, interval, and the opt-in toggles.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: Interval,
    pub fill_missing: bool,
    pub include_options: bool,
}

/// Result of a sync run: per-symbol bars plus per-symbol status.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Ordered map symbol → bars covering the requested range. Symbols with
    /// `NoData` or `Failed` status are absent.
    pub data: BTreeMap<String, Vec<Bar>>,
    pub statuses: BTreeMap<String, SymbolStatus>,
    /// Per-symbol options fetch failures (the options path never blocks bars).
    pub options_failures: Vec<(String, String)>,
}

impl SyncOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.statuses
            .values()
            .all(|s| matches!(s, SymbolStatus::FromStore | SymbolStatus::Fetched))
    }
}

/// Decide whether the stored coverage satisfies the request.
fn needs_fetch(
    coverage: Option<(NaiveDateTime, NaiveDateTime)>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    match coverage {
        None => true,
        Some((min_ts, max_ts)) => {
            start < min_ts || end > max_ts + ChronoDuration::days(COVERAGE_GRACE_DAYS)
        }
    }
}

/// Run a bounded-retry loop around an external call.
fn with_retries<T>(
    what: &str,
    mut call: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    let mut delay = FETCH_BASE_DELAY;
    let mut attempt = 1;
    loop {
        match call() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < FETCH_ATTEMPTS => {
                warn!(%what, %attempt, error = %e, "external call failed, retrying");
                std::thread::sleep(delay);
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sync bars for a batch of symbols.
///
/// Store failures are fatal (silent data loss is worse than stopping);
/// provider failures degrade to per-symbol `Failed`/`NoData` statuses so one
/// bad instrument never aborts the rest of the batch.
pub fn sync_bars(
    provider: &dyn MarketDataProvider,
    store: &BarStore,
    request: &SyncRequest,
) -> Result<SyncOutcome, SyncError> {
    let mut data = BTreeMap::new();
    let mut statuses = BTreeMap::new();
    let mut to_fetch: Vec<String> = Vec::new();

    for raw in &request.symbols {
        let symbol = canonical_symbol(raw);
        if statuses.contains_key(&symbol) {
            continue; // request listed the symbol twice
        }
        let coverage = store.coverage(&symbol, request.interval);
        if needs_fetch(coverage, request.start, request.end) {
            debug!(%symbol, ?coverage, "coverage miss, scheduling fetch");
            statuses.insert(symbol.clone(), SymbolStatus::Fetched);
            to_fetch.push(symbol);
        } else {
            debug!(%symbol, ?coverage, "coverage hit, serving from store");
            let bars = store.read_range(
                &symbol,
                request.interval,
                Some(request.start),
                Some(request.end),
            )?;
            statuses.insert(symbol.clone(), SymbolStatus::FromStore);
            data.insert(symbol, bars);
        }
    }

    if !to_fetch.is_empty() {
        info!(count = to_fetch.len(), "fetching symbols from provider");
        let fetched = with_retries("fetch_bars", || {
            provider.fetch_bars(&to_fetch, request.start, request.end, request.interval)
        });
        match fetched {
            Ok(mut frames) => {
                for symbol in &to_fetch {
                    match frames.remove(symbol) {
                        Some(bars) if !bars.is_empty() => {
                            let cleaned = clean_bars(bars, request.fill_missing);
                            store.upsert(symbol, request.interval, &cleaned)?;
                            // Providers may over-deliver; the store keeps the
                            // full batch but downstream only sees the range.
                            let in_range: Vec<Bar> = cleaned
                                .into_iter()
                                .filter(|b| b.ts >= request.start && b.ts <= request.end)
                                .collect();
                            data.insert(symbol.clone(), in_range);
                        }
                        _ => {
                            warn!(%symbol, "provider returned no data, skipping downstream");
                            statuses.insert(symbol.clone(), SymbolStatus::NoData);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "provider batch failed after retries");
                for symbol in &to_fetch {
                    statuses.insert(symbol.clone(), SymbolStatus::Failed(e.to_string()));
                }
            }
        }
    }

    let mut options_failures = Vec::new();
    if request.include_options {
        for raw in &request.symbols {
            let symbol = canonical_symbol(raw);
            let chain = with_retries("fetch_option_chain", || {
                provider.fetch_option_chain(&symbol)
            });
            match chain {
                Ok(contracts) => store.write_option_chain(&symbol, &contracts)?,
                Err(e) => {
                    warn!(%symbol, error = %e, "options fetch failed");
                    options_failures.push((symbol, e.to_string()));
                }
            }
        }
    }

    Ok(SyncOutcome {
        data,
        statuses,
        options_failures,
    })
}
