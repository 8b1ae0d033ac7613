// src/services/catalog.rs

//! Data-mode routing for year lists.
//!
//! `local` reads the pre-synced artifact and re-applies the per-season cap,
//! falling back to a live fetch for that call when the artifact is missing
//! or unreadable. `remote` always fetches live and never touches the disk.
//! Both paths go through the cache; only complete results are stored. A
//! live fetch where no season answered yields an empty, uncached list.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{AppError, Result};
use crate::models::{Anime, DataMode, trim_per_season, validate_limit};
use crate::pipeline::YearFetcher;
use crate::services::cache::{AnimeCache, YearList, cache_key};
use crate::storage::ArtifactStorage;

/// Counters for one catalog instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    pub cache_hits: usize,
    /// Times the underlying loader ran (cache misses)
    pub loads: usize,
    /// Local reads that fell back to a live fetch
    pub local_fallbacks: usize,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicUsize,
    loads: AtomicUsize,
    local_fallbacks: AtomicUsize,
}

struct Loaded {
    list: Vec<Anime>,
    /// Every season answered
    complete: bool,
}

/// Entry point for reading year lists.
pub struct AnimeCatalog {
    mode: DataMode,
    fetcher: YearFetcher,
    storage: Arc<dyn ArtifactStorage>,
    cache: AnimeCache,
    counters: Counters,
}

impl AnimeCatalog {
    pub fn new(mode: DataMode, fetcher: YearFetcher, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self {
            mode,
            fetcher,
            storage,
            cache: AnimeCache::new(),
            counters: Counters::default(),
        }
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            local_fallbacks: self.counters.local_fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Number of cached year lists.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Year list for `year`, at most `per_season_limit` per season.
    ///
    /// Repeated calls with the same arguments return the same `Arc` until
    /// [`clear_anime_cache`](Self::clear_anime_cache) is called.
    pub async fn fetch_anime_by_year(&self, year: i32, per_season_limit: u32) -> Result<YearList> {
        validate_limit(per_season_limit)?;
        let key = cache_key(self.mode, year, per_season_limit);

        if let Some(hit) = self.cache.get(&key) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache hit {}", key);
            return Ok(hit);
        }

        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        let loaded = match self.mode {
            DataMode::Local => self.load_local(year, per_season_limit).await?,
            DataMode::Remote => self.load_remote(year, per_season_limit).await?,
        };

        let list = Arc::new(loaded.list);
        if loaded.complete {
            self.cache.put(key, Arc::clone(&list));
        } else {
            log::warn!("{} is incomplete, not cached", key);
        }
        Ok(list)
    }

    /// Drop every cached list. Call after the per-season limit changes.
    pub fn clear_anime_cache(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        log::info!("Cleared {} cached year lists", dropped);
    }

    async fn load_local(&self, year: i32, per_season_limit: u32) -> Result<Loaded> {
        let failure = match self.storage.load_year(year).await {
            Ok(Some(list)) => {
                return Ok(Loaded {
                    list: trim_per_season(list, per_season_limit as usize),
                    complete: true,
                });
            }
            Ok(None) => AppError::LocalArtifactMissing { year },
            Err(e) => e,
        };

        self.counters.local_fallbacks.fetch_add(1, Ordering::Relaxed);
        match &failure {
            AppError::LocalArtifactMissing { .. } => {
                log::warn!("[Fallback] {}; fetching {} live", failure, year)
            }
            other => log::warn!(
                "[Fallback] local artifact for {} is unreadable ({}); fetching live",
                year,
                other
            ),
        }
        self.load_remote(year, per_season_limit).await
    }

    async fn load_remote(&self, year: i32, per_season_limit: u32) -> Result<Loaded> {
        let batch = self.fetcher.fetch_year(year, per_season_limit, None).await;

        if batch.all_failed() {
            let last = batch
                .seasons
                .iter()
                .rev()
                .find_map(|s| s.error.clone())
                .unwrap_or_default();
            log::error!("{}", AppError::AllSeasonsFailed { year, last });
            return Ok(Loaded {
                list: Vec::new(),
                complete: false,
            });
        }

        let failed = batch.failed_seasons();
        if !failed.is_empty() {
            log::warn!("{} returned without {:?}", year, failed);
        }
        Ok(Loaded {
            complete: failed.is_empty(),
            list: batch.into_anime(),
        })
    }
}
