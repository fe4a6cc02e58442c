//! Market data plumbing: provider interface, persistent bar store,
//! post-fetch cleaning, and the cache-aware sync orchestrator.

pub mod clean;
pub mod csv_import;
pub mod provider;
pub mod store;
pub mod sync;

pub use clean::clean_bars;
pub use csv_import::CsvProvider;
pub use provider::{MarketDataProvider, ProviderError};
pub use store::{BarStore, CoverageMeta, StoreError};
pub use sync::{sync_bars, SymbolStatus, SyncError, SyncOutcome, SyncRequest};
