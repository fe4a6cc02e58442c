//! Domain types: bars, sampling intervals, option contracts.

pub mod bar;
pub mod interval;
pub mod options;

pub use bar::Bar;
pub use interval::Interval;
pub use options::{OptionContract, OptionKind};

/// Canonical form of an instrument symbol: upper-cased, trimmed.
///
/// The store and the sync orchestrator key everything by this form so that
/// "aapl" and "AAPL" never produce two partitions.
pub fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
