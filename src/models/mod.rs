// src/models/mod.rs

//! Domain models for the sync tool and the catalog.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod anime;
mod config;
mod sync;

// Re-export all public types
pub use anime::{
    Anime, AnimeTitle, CoverImage, Season, dedup_by_id, group_by_season,
    sort_by_season_popularity, trim_per_season,
};
pub use config::{
    CatalogConfig, ClientConfig, Config, DataMode, FetchConfig, ImageConfig, LoggingConfig,
    MAX_PER_SEASON_LIMIT, SchedulerConfig, StorageConfig, validate_limit,
};
pub use sync::{SeasonOutcome, SyncMeta, YearBatch, YearIndex};

#[cfg(test)]
pub(crate) use anime::tests::sample as sample_anime;
