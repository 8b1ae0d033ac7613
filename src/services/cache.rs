//! Process-wide memo of year lists.
//!
//! Keys are `{mode}:{year}-{limit}`. Values are shared behind an `Arc`, so
//! every hit for the same key hands out the same allocation and nobody can
//! mutate a list another caller is reading.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Anime, DataMode};

/// Shared, immutable year list.
pub type YearList = Arc<Vec<Anime>>;

/// Cache key for a mode/year/limit triple.
pub fn cache_key(mode: DataMode, year: i32, per_season_limit: u32) -> String {
    format!("{}:{}-{}", mode, year, per_season_limit)
}

/// In-memory year list cache.
#[derive(Debug, Default)]
pub struct AnimeCache {
    entries: Mutex<HashMap<String, YearList>>,
}

impl AnimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, YearList>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<YearList> {
        self.entries().get(key).cloned()
    }

    /// Store `list` under `key`. A later put for the same key wins.
    pub fn put(&self, key: String, list: YearList) {
        self.entries().insert(key, list);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
