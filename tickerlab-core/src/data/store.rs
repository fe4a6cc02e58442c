//! Persistent bar store: one Parquet partition per (symbol, interval).
//!
//! Layout: `{root}/symbol={SYMBOL}/{interval}.parquet` with a JSON coverage
//! sidecar `{interval}.meta.json`, plus `options.parquet` for chain
//! snapshots.
//!
//! Properties:
//! - Upsert keyed by timestamp (last-write-wins, union coverage semantics)
//! - Atomic writes (write to .tmp, rename into place)
//! - Fixed schema — all price/volume columns are f64, no runtime inference
//! - Missing partitions read as empty / no coverage, never as errors

use crate::domain::{canonical_symbol, Bar, Interval, OptionContract, OptionKind};
use chrono::{NaiveDateTime, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error types for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("metadata error: {0}")]
    Meta(String),
}

/// Coverage sidecar for one (symbol, interval) partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageMeta {
    pub symbol: String,
    pub interval: Interval,
    pub min_ts: NaiveDateTime,
    pub max_ts: NaiveDateTime,
    pub bar_count: usize,
    pub data_hash: String,
    pub updated_at: NaiveDateTime,
}

/// The keyed Parquet store.
pub struct BarStore {
    root: PathBuf,
}

impl BarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("symbol={symbol}"))
    }

    fn bars_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{interval}.parquet"))
    }

    fn meta_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{interval}.meta.json"))
    }

    fn options_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("options.parquet")
    }

    /// Idempotent upsert keyed by timestamp.
    ///
    /// Merges the batch with whatever the partition already holds;
    /// re-written timestamps are replaced in place (last-write-wins). The
    /// coverage sidecar is recomputed from the merged rows, so repeated
    /// writes accumulate union coverage. An empty batch is a no-op.
    pub fn upsert(&self, symbol: &str, interval: Interval, bars: &[Bar]) -> Result<(), StoreError> {
        if bars.is_empty() {
            return Ok(());
        }
        let symbol = canonical_symbol(symbol);

        let mut merged: BTreeMap<NaiveDateTime, Bar> = BTreeMap::new();
        for bar in self.load_partition(&symbol, interval)? {
            merged.insert(bar.ts, bar);
        }
        for bar in bars {
            merged.insert(bar.ts, bar.clone());
        }
        let merged: Vec<Bar> = merged.into_values().collect();

        let sym_dir = self.symbol_dir(&symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;

        let df = bars_to_dataframe(&merged)?;
        let path = self.bars_path(&symbol, interval);
        write_parquet_atomic(&df, &path)?;

        let meta = CoverageMeta {
            symbol: symbol.clone(),
            interval,
            min_ts: merged.first().unwrap().ts,
            max_ts: merged.last().unwrap().ts,
            bar_count: merged.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(&merged)
                    .map_err(|e| StoreError::Meta(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            updated_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Meta(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(&symbol, interval), meta_json)
            .map_err(|e| StoreError::Meta(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Min/max stored timestamps for a partition, `None` if it doesn't exist.
    ///
    /// Never errors for a missing partition. A stale or missing sidecar next
    /// to an existing Parquet file falls back to scanning the file.
    pub fn coverage(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let symbol = canonical_symbol(symbol);
        if let Some(meta) = self.get_meta(&symbol, interval) {
            return Some((meta.min_ts, meta.max_ts));
        }
        let bars = self.load_partition(&symbol, interval).ok()?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.ts, last.ts)),
            _ => None,
        }
    }

    /// Coverage sidecar for a partition, if present.
    pub fn get_meta(&self, symbol: &str, interval: Interval) -> Option<CoverageMeta> {
        let symbol = canonical_symbol(symbol);
        let content = fs::read_to_string(self.meta_path(&symbol, interval)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// All coverage sidecars in the store, sorted by symbol.
    pub fn partitions(&self) -> Vec<CoverageMeta> {
        let mut metas = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return metas;
        };
        for entry in entries.flatten() {
            let Ok(inner) = fs::read_dir(entry.path()) else {
                continue;
            };
            for file in inner.flatten() {
                let path = file.path();
                let is_meta = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".meta.json"));
                if !is_meta {
                    continue;
                }
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(meta) = serde_json::from_str::<CoverageMeta>(&content) {
                        metas.push(meta);
                    }
                }
            }
        }
        metas.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        metas
    }

    /// Read bars with inclusive timestamp bounds.
    ///
    /// A missing partition yields an empty vector, not an error.
    pub fn read_range(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, StoreError> {
        let symbol = canonical_symbol(symbol);
        let bars = self.load_partition(&symbol, interval)?;
        Ok(bars
            .into_iter()
            .filter(|b| start.map_or(true, |s| b.ts >= s) && end.map_or(true, |e| b.ts <= e))
            .collect())
    }

    /// Overwrite the options chain snapshot for a symbol.
    pub fn write_option_chain(
        &self,
        symbol: &str,
        contracts: &[OptionContract],
    ) -> Result<(), StoreError> {
        let symbol = canonical_symbol(symbol);
        let sym_dir = self.symbol_dir(&symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;
        let df = options_to_dataframe(contracts)?;
        write_parquet_atomic(&df, &self.options_path(&symbol))
    }

    /// Read the options chain snapshot for a symbol; empty if none persisted.
    pub fn read_option_chain(&self, symbol: &str) -> Result<Vec<OptionContract>, StoreError> {
        let symbol = canonical_symbol(symbol);
        let path = self.options_path(&symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let df = read_parquet(&path)?;
        dataframe_to_options(&df)
    }

    fn load_partition(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, StoreError> {
        let path = self.bars_path(symbol, interval);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let df = read_parquet(&path)?;
        let mut bars = dataframe_to_bars(&df)?;
        bars.sort_by_key(|b| b.ts);
        Ok(bars)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

const BAR_COLUMNS: [&str; 7] = ["ts", "open", "high", "low", "close", "volume", "adj_close"];

fn write_parquet_atomic(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path)
        .map_err(|e| StoreError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io(format!("atomic rename failed: {e}"))
    })
}

fn read_parquet(path: &Path) -> Result<DataFrame, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Parquet(format!("open: {e}")))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))
}

fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, StoreError> {
    let ts: Vec<i64> = bars
        .iter()
        .map(|b| b.ts.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let adj_closes: Vec<Option<f64>> = bars.iter().map(|b| b.adj_close).collect();

    DataFrame::new(vec![
        Column::new("ts".into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| StoreError::Parquet(format!("ts cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("adj_close".into(), adj_closes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, StoreError> {
    for col_name in &BAR_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(StoreError::Schema(format!("missing column '{col_name}'")));
        }
    }

    let schema_err = |name: &str, e: PolarsError| {
        StoreError::Schema(format!("column '{name}' has unexpected type: {e}"))
    };

    let ts_ca = df
        .column("ts")
        .unwrap()
        .datetime()
        .map_err(|e| schema_err("ts", e))?;
    let open_ca = df
        .column("open")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("open", e))?;
    let high_ca = df
        .column("high")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("high", e))?;
    let low_ca = df
        .column("low")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("low", e))?;
    let close_ca = df
        .column("close")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("close", e))?;
    let vol_ca = df
        .column("volume")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("volume", e))?;
    let adj_ca = df
        .column("adj_close")
        .unwrap()
        .f64()
        .map_err(|e| schema_err("adj_close", e))?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let ms = ts_ca
            .get(i)
            .ok_or_else(|| StoreError::Schema(format!("null timestamp at row {i}")))?;
        let ts = chrono::DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| StoreError::Schema(format!("invalid timestamp at row {i}")))?
            .naive_utc();
        bars.push(Bar {
            ts,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(f64::NAN),
            adj_close: adj_ca.get(i),
        });
    }
    Ok(bars)
}

fn options_to_dataframe(contracts: &[OptionContract]) -> Result<DataFrame, StoreError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let expirations: Vec<i32> = contracts
        .iter()
        .map(|c| (c.expiration - epoch).num_days() as i32)
        .collect();
    let kinds: Vec<&str> = contracts.iter().map(|c| c.kind.as_str()).collect();
    let strikes: Vec<f64> = contracts.iter().map(|c| c.strike).collect();
    let lasts: Vec<f64> = contracts.iter().map(|c| c.last_price).collect();
    let bids: Vec<f64> = contracts.iter().map(|c| c.bid).collect();
    let asks: Vec<f64> = contracts.iter().map(|c| c.ask).collect();
    let volumes: Vec<f64> = contracts.iter().map(|c| c.volume).collect();
    let open_interest: Vec<f64> = contracts.iter().map(|c| c.open_interest).collect();
    let ivs: Vec<f64> = contracts.iter().map(|c| c.implied_volatility).collect();

    DataFrame::new(vec![
        Column::new("expiration".into(), expirations)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("expiration cast: {e}")))?,
        Column::new("kind".into(), kinds),
        Column::new("strike".into(), strikes),
        Column::new("last_price".into(), lasts),
        Column::new("bid".into(), bids),
        Column::new("ask".into(), asks),
        Column::new("volume".into(), volumes),
        Column::new("open_interest".into(), open_interest),
        Column::new("implied_volatility".into(), ivs),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

fn dataframe_to_options(df: &DataFrame) -> Result<Vec<OptionContract>, StoreError> {
    let get_f64 = |name: &str| -> Result<Vec<f64>, StoreError> {
        let ca = df
            .column(name)
            .map_err(|e| StoreError::Schema(format!("missing column '{name}': {e}")))?
            .f64()
            .map_err(|e| StoreError::Schema(format!("column '{name}': {e}")))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };

    let exp_ca = df
        .column("expiration")
        .map_err(|e| StoreError::Schema(format!("missing column 'expiration': {e}")))?
        .date()
        .map_err(|e| StoreError::Schema(format!("column 'expiration': {e}")))?;
    let kind_ca = df
        .column("kind")
        .map_err(|e| StoreError::Schema(format!("missing column 'kind': {e}")))?
        .str()
        .map_err(|e| StoreError::Schema(format!("column 'kind': {e}")))?;

    let strikes = get_f64("strike")?;
    let lasts = get_f64("last_price")?;
    let bids = get_f64("bid")?;
    let asks = get_f64("ask")?;
    let volumes = get_f64("volume")?;
    let open_interest = get_f64("open_interest")?;
    let ivs = get_f64("implied_volatility")?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let n = df.height();
    let mut contracts = Vec::with_capacity(n);
    for i in 0..n {
        let days = exp_ca
            .get(i)
            .ok_or_else(|| StoreError::Schema(format!("null expiration at row {i}")))?;
        let kind = match kind_ca.get(i) {
            Some("call") => OptionKind::Call,
            Some("put") => OptionKind::Put,
            other => {
                return Err(StoreError::Schema(format!(
                    "unexpected option kind {other:?} at row {i}"
                )))
            }
        };
        contracts.push(OptionContract {
            expiration: epoch + chrono::Duration::days(days as i64),
            kind,
            strike: strikes[i],
            last_price: lasts[i],
            bid: bids[i],
            ask: asks[i],
            volume: volumes[i],
            open_interest: open_interest[i],
            implied_volatility: ivs[i],
        });
    }
    Ok(contracts)
}
