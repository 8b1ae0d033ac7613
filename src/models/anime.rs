//! Canonical anime record and season bucketing.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// One of the four release quarters of a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Seasons in calendar order. Flattened output always follows this order.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Upstream enum name (`WINTER`, `SPRING`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Fall => "FALL",
        }
    }

    /// Human label including the month the season starts.
    pub fn label(&self) -> &'static str {
        match self {
            Season::Winter => "Winter (Jan)",
            Season::Spring => "Spring (Apr)",
            Season::Summer => "Summer (Jul)",
            Season::Fall => "Fall (Oct)",
        }
    }

    /// Position in [`Season::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Map a zero-based month (0 = January) to its season.
    pub fn from_month0(month0: u32) -> Self {
        match month0 {
            0..=2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    /// Current season and calendar year for a wall-clock date.
    pub fn current<D: Datelike>(date: &D) -> (i32, Season) {
        (date.year(), Season::from_month0(date.month0()))
    }

    /// Lenient parse used for upstream and artifact data.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WINTER" => Some(Season::Winter),
            "SPRING" => Some(Season::Spring),
            "SUMMER" => Some(Season::Summer),
            "FALL" | "AUTUMN" => Some(Season::Fall),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::parse(s).ok_or_else(|| AppError::validation(format!("Unknown season '{s}'")))
    }
}

/// Title variants. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeTitle {
    #[serde(default)]
    pub romaji: String,
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub native: String,
}

/// Cover image variants plus the dominant color hint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    #[serde(default)]
    pub extra_large: String,
    #[serde(default)]
    pub large: String,
    #[serde(default)]
    pub color: String,
}

/// Canonical anime record shared by the catalog and the sync artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    /// Always a string, even though AniList ids are numeric
    pub id: String,
    pub title: AnimeTitle,
    pub cover_image: CoverImage,
    #[serde(default)]
    pub banner_image: Option<String>,
    /// Stored as received; use [`Anime::plain_description`] for display
    #[serde(default)]
    pub description: Option<String>,
    /// `None` when the source value is not one of the four seasons
    #[serde(default, deserialize_with = "lenient_season")]
    pub season: Option<Season>,
    #[serde(default)]
    pub season_year: Option<i32>,
    /// Source-ranked order
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub average_score: Option<i32>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub format: Option<String>,
}

fn lenient_season<'de, D>(deserializer: D) -> Result<Option<Season>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Season::parse))
}

static BR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("static regex"));

impl Anime {
    /// Preferred display title: native, then romaji, then english.
    pub fn display_title(&self) -> &str {
        [&self.title.native, &self.title.romaji, &self.title.english]
            .into_iter()
            .find(|t| !t.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Secondary title shown under the display title.
    pub fn subtitle(&self) -> &str {
        if self.title.romaji != self.title.native {
            &self.title.romaji
        } else {
            &self.title.english
        }
    }

    /// Description with HTML markup removed and entities decoded.
    pub fn plain_description(&self) -> String {
        let Some(raw) = self.description.as_deref() else {
            return String::new();
        };
        let with_breaks = BR_TAG.replace_all(raw, "\n");
        let fragment = Html::parse_fragment(&with_breaks);
        let text: String = fragment.root_element().text().collect();
        text.trim().to_string()
    }

    /// Popularity used for ordering; missing counts as zero.
    pub fn popularity_rank(&self) -> i32 {
        self.popularity.unwrap_or(0)
    }
}

/// Bucket records by season.
///
/// All four seasons are always present as keys. Records without a
/// recognized season are left out of every bucket.
pub fn group_by_season(list: &[Anime]) -> BTreeMap<Season, Vec<&Anime>> {
    let mut grouped: BTreeMap<Season, Vec<&Anime>> =
        Season::ALL.iter().map(|s| (*s, Vec::new())).collect();
    for anime in list {
        if let Some(season) = anime.season {
            grouped.entry(season).or_default().push(anime);
        }
    }
    grouped
}

/// Keep at most `limit` records per season, flattened in season order.
pub fn trim_per_season(list: Vec<Anime>, limit: usize) -> Vec<Anime> {
    let mut grouped: BTreeMap<Season, Vec<Anime>> = BTreeMap::new();
    for anime in list {
        if let Some(season) = anime.season {
            let bucket = grouped.entry(season).or_default();
            if bucket.len() < limit {
                bucket.push(anime);
            }
        }
    }
    grouped.into_values().flatten().collect()
}

/// Order by season, then by descending popularity. The sort is stable.
pub fn sort_by_season_popularity(list: &mut [Anime]) {
    list.sort_by(|a, b| {
        let sa = a.season.map_or(usize::MAX, |s| s.index());
        let sb = b.season.map_or(usize::MAX, |s| s.index());
        sa.cmp(&sb)
            .then_with(|| b.popularity_rank().cmp(&a.popularity_rank()))
    });
}

/// Drop records whose id was already seen, keeping the first occurrence.
pub fn dedup_by_id(list: Vec<Anime>) -> Vec<Anime> {
    let mut seen = HashSet::new();
    list.into_iter()
        .filter(|anime| seen.insert(anime.id.clone()))
        .collect()
}
