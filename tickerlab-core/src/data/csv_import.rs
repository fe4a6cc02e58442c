//! CSV import provider.
//!
//! Reads per-symbol CSV files from a directory: `{dir}/{SYMBOL}.csv` with
//! columns `date,open,high,low,close,volume[,adj_close]`. This is the
//! offline source shipped with the repository; remote retrieval is an
//! external collaborator consumed through the same trait.

use super::provider::{MarketDataProvider, ProviderError};
use crate::domain::{canonical_symbol, Bar, Interval, OptionContract};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Provider backed by a directory of per-symbol CSV files.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read_symbol(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, ProviderError> {
        let path = self.symbol_path(symbol);
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| ProviderError::ResponseFormatChanged(e.to_string()))?
            .clone();
        let col = |name: &str| -> Option<usize> {
            headers.iter().position(|h| h.eq_ignore_ascii_case(name))
        };

        let date_idx = col("date")
            .ok_or_else(|| ProviderError::ResponseFormatChanged("missing 'date' column".into()))?;
        let mut required = |name: &str| -> Result<usize, ProviderError> {
            col(name).ok_or_else(|| {
                ProviderError::ResponseFormatChanged(format!("missing '{name}' column"))
            })
        };
        let open_idx = required("open")?;
        let high_idx = required("high")?;
        let low_idx = required("low")?;
        let close_idx = required("close")?;
        let volume_idx = required("volume")?;
        let adj_idx = col("adj_close");

        let mut bars = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| ProviderError::ResponseFormatChanged(e.to_string()))?;
            let ts = parse_timestamp(&record[date_idx])?;
            if ts < start || ts > end {
                continue;
            }
            bars.push(Bar {
                ts,
                open: parse_field(&record[open_idx]),
                high: parse_field(&record[high_idx]),
                low: parse_field(&record[low_idx]),
                close: parse_field(&record[close_idx]),
                volume: parse_field(&record[volume_idx]),
                adj_close: adj_idx.and_then(|i| record[i].parse::<f64>().ok()),
            });
        }
        Ok(bars)
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ProviderError> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        .map_err(|_| ProviderError::ResponseFormatChanged(format!("unparseable date '{raw}'")))
}

/// Empty or malformed numeric fields become NaN; the cleaning pass deals
/// with them downstream.
fn parse_field(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv-import"
    }

    fn fetch_bars(
        &self,
        symbols: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
        _interval: Interval,
    ) -> Result<BTreeMap<String, Vec<Bar>>, ProviderError> {
        let mut out = BTreeMap::new();
        for symbol in symbols {
            let symbol = canonical_symbol(symbol);
            if !self.symbol_path(&symbol).exists() {
                // Unknown symbols are omitted, never a batch failure.
                debug!(%symbol, "no CSV file for symbol, omitting from batch");
                continue;
            }
            let bars = self.read_symbol(&symbol, start, end)?;
            out.insert(symbol, bars);
        }
        Ok(out)
    }

    fn fetch_option_chain(&self, _symbol: &str) -> Result<Vec<OptionContract>, ProviderError> {
        Err(ProviderError::OptionsUnsupported {
            provider: self.name().to_string(),
        })
    }
}
