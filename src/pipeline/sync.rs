// src/pipeline/sync.rs

//! Offline sync of year artifacts.
//!
//! For each target year: fetch the four seasons, cap and order each
//! season, localize covers, then write the year artifact, the merged
//! index and the sync marker. Years that already have an artifact are
//! skipped unless forced.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    Anime, ImageConfig, Season, SyncMeta, YearIndex, sort_by_season_popularity, trim_per_season,
};
use crate::pipeline::YearFetcher;
use crate::services::{ImageDownloader, ImageReport, ImageSource};
use crate::storage::ArtifactStorage;
use crate::utils::log as ui;
use crate::utils::{Clock, Progress, SystemClock};

/// What one synced year produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearReport {
    pub year: i32,
    pub entries: usize,
    pub failed_seasons: Vec<Season>,
    /// `None` when the image phase was skipped
    pub images: Option<ImageReport>,
}

/// Result of a multi-year run.
#[derive(Debug, Default, Clone)]
pub struct BootstrapSummary {
    pub synced: Vec<YearReport>,
    pub skipped: Vec<i32>,
    /// Years where every season failed, with the last error
    pub failed: Vec<(i32, String)>,
}

/// Writes year artifacts to storage.
pub struct YearSyncer {
    fetcher: YearFetcher,
    storage: Arc<dyn ArtifactStorage>,
    images: Arc<dyn ImageSource>,
    image_config: ImageConfig,
    per_season_limit: u32,
    clock: Arc<dyn Clock>,
}

impl YearSyncer {
    pub fn new(
        fetcher: YearFetcher,
        storage: Arc<dyn ArtifactStorage>,
        images: Arc<dyn ImageSource>,
        image_config: &ImageConfig,
        per_season_limit: u32,
    ) -> Self {
        Self {
            fetcher,
            storage,
            images,
            image_config: image_config.clone(),
            per_season_limit,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different clock for the marker's season and rollover detection.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &dyn ArtifactStorage {
        self.storage.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn per_season_limit(&self) -> u32 {
        self.per_season_limit
    }

    /// Sync each year in order, skipping existing artifacts unless `force`.
    ///
    /// A year whose seasons all failed is recorded and the run moves on;
    /// storage errors abort the run.
    pub async fn bootstrap(&self, years: &[i32], force: bool) -> Result<BootstrapSummary> {
        ui::header(&format!(
            "Syncing {} year(s), {} per season",
            years.len(),
            self.per_season_limit
        ));

        let mut summary = BootstrapSummary::default();
        let total_seasons = years.len() * Season::ALL.len();
        let mut seasons_done = 0;

        for (i, &year) in years.iter().enumerate() {
            ui::step(i + 1, years.len(), &format!("Year {}", year));

            if !force && self.storage.year_exists(year).await? {
                log::info!("Skip {} (already exists). Use --force to refetch.", year);
                summary.skipped.push(year);
            } else {
                match self.sync_year(year).await {
                    Ok(report) => summary.synced.push(report),
                    Err(AppError::AllSeasonsFailed { year, last }) => {
                        log::error!("Year {} failed: {}", year, last);
                        summary.failed.push((year, last));
                    }
                    Err(e) => return Err(e),
                }
            }

            seasons_done += Season::ALL.len();
            ui::progress("All years", seasons_done, total_seasons, true);
        }

        ui::summary(
            "Sync finished",
            &[
                ("Synced", summary.synced.len().to_string()),
                ("Skipped", summary.skipped.len().to_string()),
                ("Failed", summary.failed.len().to_string()),
            ],
        );
        Ok(summary)
    }

    /// Fetch and write one year, replacing any existing artifact.
    pub async fn sync_year(&self, year: i32) -> Result<YearReport> {
        let limit = self.per_season_limit;
        log::info!("Fetching {} ({} per season)", year, limit);

        let label = format!("Year {}", year);
        let report_progress: Progress<'_> =
            &|done: usize, total: usize| ui::progress(&label, done, total, done == total);
        let batch = self
            .fetcher
            .fetch_year(year, limit, Some(report_progress))
            .await;

        if batch.all_failed() {
            let last = batch
                .seasons
                .iter()
                .rev()
                .find_map(|s| s.error.clone())
                .unwrap_or_default();
            return Err(AppError::AllSeasonsFailed { year, last });
        }

        let failed = batch.failed_seasons();
        if !failed.is_empty() {
            log::warn!("{} is partial, missing {:?}", year, failed);
        }

        let mut list = trim_per_season(batch.into_anime(), limit as usize);
        sort_by_season_popularity(&mut list);

        let (list, images) = if self.image_config.enabled {
            let (list, report) = self.localize_images(list).await;
            (list, Some(report))
        } else {
            log::info!("Image download skipped");
            (list, None)
        };

        self.storage.write_year(year, &list).await?;
        self.write_index(year, &list, &failed).await?;

        let (_, now_season) = self.clock.current_season();
        self.storage
            .write_sync_meta(&SyncMeta::new(year, now_season))
            .await?;

        ui::sub_item(&format!("Saved {} entries for {}", list.len(), year));
        Ok(YearReport {
            year,
            entries: list.len(),
            failed_seasons: failed,
            images,
        })
    }

    async fn localize_images(&self, list: Vec<Anime>) -> (Vec<Anime>, ImageReport) {
        ImageDownloader::new(
            self.storage.as_ref(),
            self.images.as_ref(),
            &self.image_config,
        )
        .localize_all(list)
        .await
    }

    async fn write_index(&self, year: i32, list: &[Anime], failed: &[Season]) -> Result<()> {
        let previous = match self.storage.load_index().await {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!("Existing index unreadable, rebuilding: {}", e);
                None
            }
        };
        let index = YearIndex::merge(previous, year, list, failed, self.per_season_limit);
        self.storage.write_index(&index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchConfig;
    use crate::pipeline::testing::{FakeImages, FakeSeasons};
    use crate::storage::LocalStorage;
    use crate::utils::FixedClock;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn syncer(
        source: Arc<FakeSeasons>,
        images: Arc<FakeImages>,
        dir: &TempDir,
        limit: u32,
        images_enabled: bool,
    ) -> YearSyncer {
        let fetch = FetchConfig {
            spacing_ms: 0,
            ..FetchConfig::default()
        };
        let image_config = ImageConfig {
            enabled: images_enabled,
            spacing_ms: 0,
            ..ImageConfig::default()
        };
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        YearSyncer::new(
            YearFetcher::new(source, &fetch),
            Arc::new(LocalStorage::new(dir.path())),
            images,
            &image_config,
            limit,
        )
        .with_clock(Arc::new(clock))
    }

    #[tokio::test]
    async fn test_sync_year_writes_all_artifacts() {
        let tmp = TempDir::new().unwrap();
        let source = FakeSeasons::new(3);
        let images = Arc::new(FakeImages::default());
        let syncer = syncer(Arc::clone(&source), Arc::clone(&images), &tmp, 2, true);

        let report = syncer.sync_year(2024).await.unwrap();
        assert_eq!(report.entries, 8);
        assert!(report.failed_seasons.is_empty());
        assert_eq!(images.calls(), 8);

        let storage = LocalStorage::new(tmp.path());
        let list = storage.load_year(2024).await.unwrap().unwrap();
        // capped at two per season, most popular first
        let winter: Vec<_> = list
            .iter()
            .filter(|a| a.season == Some(Season::Winter))
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(winter, vec!["2024-winter-1", "2024-winter-0"]);
        assert_eq!(
            list[0].cover_image.extra_large,
            "/data/images/2024-winter-1.jpg"
        );

        let index = storage.load_index().await.unwrap().unwrap();
        assert_eq!(index.years, vec![2024]);
        assert_eq!(index.seasons, Season::ALL.to_vec());
        assert_eq!(index.limit_per_season, 2);

        let meta = storage.load_sync_meta().await.unwrap().unwrap();
        assert_eq!((meta.last_year, meta.last_season), (2024, Season::Fall));
    }

    #[tokio::test]
    async fn test_bootstrap_skips_existing_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let source = FakeSeasons::new(1);
        let images = Arc::new(FakeImages::default());
        let syncer = syncer(Arc::clone(&source), Arc::clone(&images), &tmp, 5, false);

        let first = syncer.bootstrap(&[2023, 2024], false).await.unwrap();
        assert_eq!(first.synced.len(), 2);
        assert_eq!(source.calls(), 8);

        let second = syncer.bootstrap(&[2023, 2024], false).await.unwrap();
        assert_eq!(second.skipped, vec![2023, 2024]);
        assert_eq!(source.calls(), 8);

        let forced = syncer.bootstrap(&[2024], true).await.unwrap();
        assert_eq!(forced.synced.len(), 1);
        assert_eq!(source.calls(), 12);
        assert_eq!(images.calls(), 0);

        let index = LocalStorage::new(tmp.path()).load_index().await.unwrap().unwrap();
        assert_eq!(index.years, vec![2024, 2023]);
    }

    #[tokio::test]
    async fn test_partial_year_is_written_and_flagged() {
        let tmp = TempDir::new().unwrap();
        let source = FakeSeasons::new(2);
        source.fail(&[Season::Summer]);
        let images = Arc::new(FakeImages::default());
        let syncer = syncer(Arc::clone(&source), images, &tmp, 5, false);

        let report = syncer.sync_year(2022).await.unwrap();
        assert_eq!(report.failed_seasons, vec![Season::Summer]);
        assert_eq!(report.entries, 6);

        let storage = LocalStorage::new(tmp.path());
        let list = storage.load_year(2022).await.unwrap().unwrap();
        assert!(list.iter().all(|a| a.season != Some(Season::Summer)));

        let index = storage.load_index().await.unwrap().unwrap();
        assert_eq!(index.incomplete.get(&2022), Some(&vec![Season::Summer]));

        // a clean resync clears the flag
        source.heal();
        syncer.sync_year(2022).await.unwrap();
        let index = storage.load_index().await.unwrap().unwrap();
        assert!(index.incomplete.is_empty());
    }

    #[tokio::test]
    async fn test_all_failed_year_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = FakeSeasons::new(2);
        source.fail(&Season::ALL);
        let images = Arc::new(FakeImages::default());
        let syncer = syncer(Arc::clone(&source), images, &tmp, 5, false);

        let summary = syncer.bootstrap(&[2021, 2022], false).await.unwrap();
        assert_eq!(summary.failed.len(), 2);
        assert!(summary.failed[0].1.contains("503"));
        assert!(!tmp.path().join("anime-2021.json").exists());
        assert!(!tmp.path().join("sync-meta.json").exists());
    }
}
