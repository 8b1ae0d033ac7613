// src/services/anilist.rs

//! Season query client for the AniList GraphQL API.
//!
//! One request per `(year, season)`, page 1 with `perPage` equal to the
//! per-season limit, sorted by popularity. Each request runs under the
//! retry executor; responses are classified into the error taxonomy
//! before any JSON is trusted.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{Anime, AnimeTitle, ClientConfig, CoverImage, Season};
use crate::utils::http::{create_async_client, retry_after_secs};
use crate::utils::{RetryPolicy, with_retry};

const SEASON_QUERY: &str = r#"
query ($year: Int, $season: MediaSeason, $page: Int, $perPage: Int) {
  Page (page: $page, perPage: $perPage) {
    pageInfo { hasNextPage }
    media (season: $season, seasonYear: $year, type: ANIME, sort: POPULARITY_DESC, isAdult: false) {
      id
      title { romaji english native }
      coverImage { extraLarge large color }
      bannerImage
      description(asHtml: false)
      format
      season
      seasonYear
      genres
      averageScore
      popularity
    }
  }
}
"#;

/// Something that can list one season of one year.
#[async_trait]
pub trait SeasonSource: Send + Sync {
    /// Raw records for `(year, season)`, at most `per_page` of them.
    async fn fetch_season(&self, year: i32, season: Season, per_page: u32)
    -> Result<Vec<MediaRecord>>;
}

/// Raw media record as returned by AniList.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    #[serde(default)]
    pub id: Value,
    pub title: Option<MediaTitle>,
    pub cover_image: Option<MediaCover>,
    pub banner_image: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub season: Option<String>,
    pub season_year: Option<i32>,
    pub genres: Option<Vec<String>>,
    pub average_score: Option<i32>,
    pub popularity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCover {
    pub extra_large: Option<String>,
    pub large: Option<String>,
    pub color: Option<String>,
}

impl From<MediaRecord> for Anime {
    fn from(raw: MediaRecord) -> Self {
        let id = match raw.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let title = raw.title.unwrap_or_default();
        let cover = raw.cover_image.unwrap_or_default();
        let extra_large = cover.extra_large.unwrap_or_default();
        let large = cover
            .large
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| extra_large.clone());

        Anime {
            id,
            title: AnimeTitle {
                romaji: title.romaji.unwrap_or_default(),
                english: title.english.unwrap_or_default(),
                native: title.native.unwrap_or_default(),
            },
            cover_image: CoverImage {
                extra_large,
                large,
                color: cover.color.unwrap_or_default(),
            },
            banner_image: Some(raw.banner_image.unwrap_or_default()),
            description: Some(raw.description.unwrap_or_default()),
            season: raw.season.as_deref().and_then(Season::parse),
            season_year: raw.season_year,
            genres: raw.genres.unwrap_or_default(),
            average_score: raw.average_score,
            popularity: raw.popularity,
            format: raw.format,
        }
    }
}

/// Normalize a batch of raw records.
pub fn normalize_all(records: Vec<MediaRecord>) -> Vec<Anime> {
    records.into_iter().map(Anime::from).collect()
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    status: Option<i32>,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "Page")]
    page: Option<Page>,
}

#[derive(Deserialize)]
struct Page {
    media: Option<Vec<MediaRecord>>,
}

/// Turn one HTTP exchange into records or a classified error.
pub fn interpret_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Vec<MediaRecord>> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::RateLimited {
            retry_after: retry_after_secs(headers).map(Duration::from_secs),
        });
    }
    if !status.is_success() {
        return Err(AppError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).chars().take(200).collect(),
        });
    }

    let parsed: GraphQlResponse<Data> = serde_json::from_slice(body)
        .map_err(|e| AppError::malformed(format!("AniList JSON: {e}")))?;

    if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
        let msg = errors
            .into_iter()
            .map(|e| match e.status {
                Some(s) => format!("{} (status {})", e.message, s),
                None => e.message,
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::GraphQl(msg));
    }

    parsed
        .data
        .and_then(|d| d.page)
        .and_then(|p| p.media)
        .ok_or_else(|| AppError::malformed("AniList response has no data.Page.media"))
}

/// AniList-backed [`SeasonSource`].
#[derive(Debug, Clone)]
pub struct AniListClient {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl AniListClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_client(create_async_client(config)?, config))
    }

    /// Reuse an existing HTTP client (connection pool shared with image fetches).
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            policy: RetryPolicy::from(config),
        }
    }

    async fn query_once(&self, body: &Value) -> Result<Vec<MediaRecord>> {
        let res = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let headers = res.headers().clone();
        let bytes = res.bytes().await?;
        interpret_response(status, &headers, &bytes)
    }
}

#[async_trait]
impl SeasonSource for AniListClient {
    async fn fetch_season(
        &self,
        year: i32,
        season: Season,
        per_page: u32,
    ) -> Result<Vec<MediaRecord>> {
        let body = json!({
            "query": SEASON_QUERY,
            "variables": {
                "year": year,
                "season": season.as_str(),
                "page": 1,
                "perPage": per_page,
            }
        });
        let label = format!("{} {}", season, year);

        let records = with_retry(&self.policy, &label, || self.query_once(&body)).await?;
        log::debug!("{}: {} records", label, records.len());
        Ok(records)
    }
}
