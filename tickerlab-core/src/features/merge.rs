//! Outer-join merge of indicator series onto one timestamp axis.
//!
//! The merge is a single pass: one ordered map over the union of timestamps,
//! then column projection. Indicators with long warm-ups never truncate the
//! axis of indicators with short ones — absent rows are simply `None`.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature I/O error: {0}")]
    Io(String),

    #[error("csv error: {0}")]
    Csv(String),
}

/// One named indicator output: (timestamp, value) points. `None` marks a
/// warm-up row the indicator could not produce.
#[derive(Debug, Clone)]
pub struct FeatureSeries {
    pub name: String,
    pub points: Vec<(NaiveDateTime, Option<f64>)>,
}

impl FeatureSeries {
    /// Wrap a dense indicator output aligned to a timestamp axis, turning
    /// NaN warm-ups into `None`.
    pub fn from_dense(name: impl Into<String>, axis: &[NaiveDateTime], values: &[f64]) -> Self {
        debug_assert_eq!(axis.len(), values.len());
        Self {
            name: name.into(),
            points: axis
                .iter()
                .zip(values)
                .map(|(ts, v)| (*ts, if v.is_nan() { None } else { Some(*v) }))
                .collect(),
        }
    }
}

/// Merged per-instrument feature table: the union timestamp axis plus one
/// sparse column per indicator output, plus the instrument identifier.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub symbol: String,
    pub dates: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
}

impl FeatureFrame {
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// Column values by name.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Write `{SYMBOL}_features.csv` into `dir` (full overwrite).
    /// Unset values become empty fields.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf, FeatureError> {
        fs::create_dir_all(dir).map_err(|e| FeatureError::Io(e.to_string()))?;
        let path = dir.join(format!("{}_features.csv", self.symbol));
        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| FeatureError::Csv(e.to_string()))?;

        let mut header = vec!["date".to_string()];
        header.extend(self.columns.iter().map(|(n, _)| n.clone()));
        header.push("symbol".to_string());
        writer
            .write_record(&header)
            .map_err(|e| FeatureError::Csv(e.to_string()))?;

        for (row, ts) in self.dates.iter().enumerate() {
            let mut record = vec![ts.format("%Y-%m-%d %H:%M:%S").to_string()];
            for (_, values) in &self.columns {
                record.push(match values[row] {
                    Some(v) => v.to_string(),
                    None => String::new(),
                });
            }
            record.push(self.symbol.clone());
            writer
                .write_record(&record)
                .map_err(|e| FeatureError::Csv(e.to_string()))?;
        }
        writer.flush().map_err(|e| FeatureError::Io(e.to_string()))?;
        Ok(path)
    }
}

/// Full outer join of all series on the timestamp axis.
pub fn merge_outer(symbol: impl Into<String>, series: Vec<FeatureSeries>) -> FeatureFrame {
    // Pass 1: union axis with row numbering
    let mut row_of: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for s in &series {
        for (ts, _) in &s.points {
            let next = row_of.len();
            row_of.entry(*ts).or_insert(next);
        }
    }
    // BTreeMap iterates sorted; renumber rows in chronological order.
    let dates: Vec<NaiveDateTime> = row_of.keys().copied().collect();
    for (row, ts) in dates.iter().enumerate() {
        *row_of.get_mut(ts).unwrap() = row;
    }

    // Pass 2: project columns
    let height = dates.len();
    let columns = series
        .into_iter()
        .map(|s| {
            let mut col = vec![None; height];
            for (ts, v) in s.points {
                col[row_of[&ts]] = v;
            }
            (s.name, col)
        })
        .collect();

    FeatureFrame {
        symbol: symbol.into(),
        dates,
        columns,
    }
}
