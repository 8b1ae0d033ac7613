// src/pipeline/year.rs

//! Year fetch orchestration.
//!
//! Fans a year out into its four seasons, runs them through the bounded
//! runner and collects one outcome per season in calendar order. A season
//! that fails after its retries is recorded as failed; the other seasons
//! still complete.

use std::sync::Arc;
use std::time::Duration;

use crate::models::{FetchConfig, Season, SeasonOutcome, YearBatch};
use crate::services::SeasonSource;
use crate::services::anilist::normalize_all;
use crate::utils::{Progress, run_with_limit};

/// Fetches whole years from a [`SeasonSource`].
#[derive(Clone)]
pub struct YearFetcher {
    source: Arc<dyn SeasonSource>,
    concurrency: usize,
    spacing: Duration,
}

impl YearFetcher {
    pub fn new(source: Arc<dyn SeasonSource>, config: &FetchConfig) -> Self {
        Self {
            source,
            concurrency: config.concurrency.max(1),
            spacing: Duration::from_millis(config.spacing_ms),
        }
    }

    /// Fetch all four seasons of `year` with `per_season_limit` per page.
    pub async fn fetch_year(
        &self,
        year: i32,
        per_season_limit: u32,
        on_progress: Option<Progress<'_>>,
    ) -> YearBatch {
        let source = &self.source;
        let tasks: Vec<_> = Season::ALL
            .into_iter()
            .map(|season| {
                move || async move {
                    let result = source.fetch_season(year, season, per_season_limit).await;
                    (season, result)
                }
            })
            .collect();

        let results = run_with_limit(tasks, self.concurrency, self.spacing, on_progress).await;

        let seasons = results
            .into_iter()
            .map(|(season, result)| match result {
                Ok(records) => SeasonOutcome {
                    season,
                    anime: normalize_all(records),
                    error: None,
                },
                Err(e) => {
                    log::error!("Failed {} {}: {}", year, season, e);
                    SeasonOutcome {
                        season,
                        anime: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        YearBatch {
            year,
            per_season_limit,
            seasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::services::anilist::MediaRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedSource {
        calls: Mutex<Vec<(i32, Season, u32)>>,
        fail: Option<Season>,
    }

    #[async_trait]
    impl SeasonSource for ScriptedSource {
        async fn fetch_season(
            &self,
            year: i32,
            season: Season,
            per_page: u32,
        ) -> Result<Vec<MediaRecord>> {
            self.calls.lock().unwrap().push((year, season, per_page));
            // Winter answers last so completion order differs from input order.
            if season == Season::Winter {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            if self.fail == Some(season) {
                return Err(AppError::malformed("bad payload"));
            }
            Ok(vec![
                serde_json::from_value(json!({
                    "id": format!("{}-{}", season, 1),
                    "season": season.as_str(),
                    "seasonYear": year
                }))
                .unwrap(),
            ])
        }
    }

    fn fetcher(source: Arc<ScriptedSource>) -> YearFetcher {
        let config = FetchConfig {
            per_season_limit: 20,
            concurrency: 2,
            spacing_ms: 0,
        };
        YearFetcher::new(source, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_queries_in_season_order() {
        let source = Arc::new(ScriptedSource {
            calls: Mutex::new(Vec::new()),
            fail: None,
        });
        let batch = fetcher(Arc::clone(&source)).fetch_year(2024, 20, None).await;

        let calls = source.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|(y, _, p)| *y == 2024 && *p == 20));

        let order: Vec<_> = batch.seasons.iter().map(|s| s.season).collect();
        assert_eq!(order, Season::ALL.to_vec());
        assert!(batch.is_complete());
        assert_eq!(batch.into_anime().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_season_does_not_abort_year() {
        let source = Arc::new(ScriptedSource {
            calls: Mutex::new(Vec::new()),
            fail: Some(Season::Summer),
        });
        let batch = fetcher(source).fetch_year(2024, 20, None).await;

        assert_eq!(batch.failed_seasons(), vec![Season::Summer]);
        assert!(!batch.all_failed());
        let summer = &batch.seasons[Season::Summer.index()];
        assert!(summer.anime.is_empty());
        assert!(summer.error.as_deref().unwrap().contains("bad payload"));
        assert_eq!(batch.into_anime().len(), 3);
    }
}
