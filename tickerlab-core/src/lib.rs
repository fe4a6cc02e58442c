//! TickerLab Core — market data store, indicators, feature tables, estimator.
//!
//! This crate contains the engine of the pipeline:
//! - Domain types (bars, intervals, option contracts)
//! - Parquet-backed keyed bar store with coverage metadata
//! - Cache-aware sync orchestrator over a pluggable provider trait
//! - Indicator library with pandas-equivalent numeric semantics
//! - Outer-join feature merger producing per-instrument tables
//! - Adaptive alpha/beta estimator with closed-form window sizing

pub mod analytics;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod pipeline;
