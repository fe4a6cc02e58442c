//! Sampling interval of a bar series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar sampling interval. The string form is stable — it is used as the
/// store partition key and in provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    /// Periods per year for annualizing per-period quantities.
    ///
    /// Weekly → 52, monthly → 12, everything daily-or-finer → 252.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Interval::Weekly => 52.0,
            Interval::Monthly => 12.0,
            _ => 252.0,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::Min1),
            "5m" => Ok(Interval::Min5),
            "15m" => Ok(Interval::Min15),
            "30m" => Ok(Interval::Min30),
            "1h" => Ok(Interval::Hour1),
            "1d" => Ok(Interval::Daily),
            "1wk" => Ok(Interval::Weekly),
            "1mo" => Ok(Interval::Monthly),
            other => Err(format!("unknown interval '{other}'")),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(i: Interval) -> Self {
        i.as_str().to_string()
    }
}
