//! Option contract records for the opt-in derivatives fetch path.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Call or put side of an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Call => "call",
            OptionKind::Put => "put",
        }
    }
}

/// One row of an options chain snapshot.
///
/// Persisted as-is; the system records chains but does not price them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub expiration: NaiveDate,
    pub kind: OptionKind,
    pub strike: f64,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: f64,
    pub open_interest: f64,
    pub implied_volatility: f64,
}
