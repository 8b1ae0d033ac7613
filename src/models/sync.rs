//! Artifact metadata and fetch outcomes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anime::{Anime, Season, dedup_by_id};

/// Result of fetching one season of one year.
#[derive(Debug, Clone)]
pub struct SeasonOutcome {
    pub season: Season,
    pub anime: Vec<Anime>,
    /// Terminal error message when the season could not be fetched
    pub error: Option<String>,
}

impl SeasonOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// All four season outcomes of one year, in season order.
#[derive(Debug, Clone)]
pub struct YearBatch {
    pub year: i32,
    pub per_season_limit: u32,
    pub seasons: Vec<SeasonOutcome>,
}

impl YearBatch {
    /// Seasons whose fetch failed after exhausting retries.
    pub fn failed_seasons(&self) -> Vec<Season> {
        self.seasons
            .iter()
            .filter(|s| s.is_failed())
            .map(|s| s.season)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.seasons.iter().all(|s| !s.is_failed())
    }

    pub fn all_failed(&self) -> bool {
        !self.seasons.is_empty() && self.seasons.iter().all(SeasonOutcome::is_failed)
    }

    /// Flatten in season order, dropping duplicate ids.
    pub fn into_anime(self) -> Vec<Anime> {
        let flat = self.seasons.into_iter().flat_map(|s| s.anime).collect();
        dedup_by_id(flat)
    }
}

/// Summary written to `index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearIndex {
    pub generated_at: DateTime<Utc>,
    /// Newest first
    pub years: Vec<i32>,
    pub seasons: Vec<Season>,
    pub limit_per_season: u32,
    /// Seasons that failed during the last sync of a year
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub incomplete: BTreeMap<i32, Vec<Season>>,
}

impl YearIndex {
    /// Merge a freshly synced year into a previous index (if any).
    pub fn merge(
        previous: Option<YearIndex>,
        year: i32,
        list: &[Anime],
        failed: &[Season],
        limit_per_season: u32,
    ) -> Self {
        let mut years: BTreeSet<i32> = BTreeSet::new();
        let mut seasons: BTreeSet<Season> = BTreeSet::new();
        let mut incomplete = BTreeMap::new();

        if let Some(prev) = previous {
            years.extend(prev.years);
            seasons.extend(prev.seasons);
            incomplete = prev.incomplete;
        }

        years.insert(year);
        seasons.extend(list.iter().filter_map(|a| a.season));

        if failed.is_empty() {
            incomplete.remove(&year);
        } else {
            incomplete.insert(year, failed.to_vec());
        }

        Self {
            generated_at: Utc::now(),
            years: years.into_iter().rev().collect(),
            seasons: seasons.into_iter().collect(),
            limit_per_season,
            incomplete,
        }
    }
}

/// Marker written to `sync-meta.json` after every sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    pub last_year: i32,
    pub last_season: Season,
    pub updated_at: DateTime<Utc>,
}

impl SyncMeta {
    pub fn new(last_year: i32, last_season: Season) -> Self {
        Self {
            last_year,
            last_season,
            updated_at: Utc::now(),
        }
    }

    /// Whether the marker points at a different season than `(year, season)`.
    pub fn is_stale(&self, year: i32, season: Season) -> bool {
        self.last_year != year || self.last_season != season
    }
}
