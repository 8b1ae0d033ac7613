//! In-memory upstreams shared by the pipeline tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::Season;
use crate::services::anilist::MediaRecord;
use crate::services::images::{ImagePayload, ImageSource};
use crate::services::SeasonSource;

/// Returns `per_season` records for every season, ignoring `per_page`,
/// with popularity rising by index so the sync has to reorder them.
pub(crate) struct FakeSeasons {
    pub calls: AtomicUsize,
    per_season: usize,
    failing: Mutex<HashSet<Season>>,
}

impl FakeSeasons {
    pub fn new(per_season: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            per_season,
            failing: Mutex::new(HashSet::new()),
        })
    }

    pub fn fail(&self, seasons: &[Season]) {
        self.failing.lock().unwrap().extend(seasons.iter().copied());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeasonSource for FakeSeasons {
    async fn fetch_season(
        &self,
        year: i32,
        season: Season,
        _per_page: u32,
    ) -> Result<Vec<MediaRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&season) {
            return Err(AppError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok((0..self.per_season)
            .map(|i| {
                let id = format!("{}-{}-{}", year, season.as_str().to_lowercase(), i);
                serde_json::from_value(json!({
                    "id": id,
                    "title": { "romaji": format!("Show {i}") },
                    "coverImage": { "extraLarge": format!("https://img.example/{id}.jpg") },
                    "season": season.as_str(),
                    "seasonYear": year,
                    "popularity": (i as i32 + 1) * 10
                }))
                .unwrap()
            })
            .collect())
    }
}

/// Counts image requests and returns a few bytes.
#[derive(Default)]
pub(crate) struct FakeImages {
    pub calls: AtomicUsize,
}

impl FakeImages {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for FakeImages {
    async fn fetch_image(&self, url: &str) -> Result<ImagePayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ImagePayload {
            bytes: url.as_bytes().to_vec(),
            extension: None,
        })
    }
}
