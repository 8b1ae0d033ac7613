//! Fetch and sync pipelines.
//!
//! - `YearFetcher`: live fetch of one year, season by season
//! - `YearSyncer`: offline sync writing year artifacts, index and marker
//! - `SyncScheduler`: resync on season rollover

pub mod scheduler;
pub mod sync;
pub mod year;

#[cfg(test)]
pub(crate) mod testing;

pub use scheduler::{SyncScheduler, TickOutcome};
pub use sync::{BootstrapSummary, YearReport, YearSyncer};
pub use year::YearFetcher;
