//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Highest `perPage` AniList accepts.
pub const MAX_PER_SEASON_LIMIT: u32 = 50;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream client and retry behavior
    #[serde(default)]
    pub client: ClientConfig,

    /// Metadata fetch phase
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cover image download phase
    #[serde(default)]
    pub images: ImageConfig,

    /// Artifact locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Data-mode selection for the catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Periodic re-sync
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `ANISYNC_DATA_MODE` and `ANISYNC_DATA_DIR` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(mode) = std::env::var("ANISYNC_DATA_MODE") {
            match mode.parse() {
                Ok(mode) => self.catalog.mode = mode,
                Err(e) => log::warn!("Ignoring ANISYNC_DATA_MODE: {}", e),
            }
        }
        if let Ok(dir) = std::env::var("ANISYNC_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.storage.data_dir = PathBuf::from(dir);
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.client.endpoint.trim().is_empty() {
            return Err(AppError::validation("client.endpoint is empty"));
        }
        url::Url::parse(&self.client.endpoint)?;
        if self.client.user_agent.trim().is_empty() {
            return Err(AppError::validation("client.user_agent is empty"));
        }
        if self.client.timeout_secs == 0 {
            return Err(AppError::validation("client.timeout_secs must be > 0"));
        }
        validate_limit(self.fetch.per_season_limit)?;
        if self.fetch.concurrency == 0 {
            return Err(AppError::validation("fetch.concurrency must be > 0"));
        }
        if self.images.concurrency == 0 {
            return Err(AppError::validation("images.concurrency must be > 0"));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(AppError::validation("scheduler.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Check that a per-season limit is within what upstream serves per page.
pub fn validate_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_PER_SEASON_LIMIT {
        return Err(AppError::validation(format!(
            "per-season limit must be within 1..={MAX_PER_SEASON_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

/// Upstream GraphQL client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Hard per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Cooldown after a 429 without a `Retry-After` header
    #[serde(default = "defaults::rate_limit_cooldown")]
    pub rate_limit_cooldown_secs: u64,

    /// Pause before retrying any other transient failure
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            rate_limit_cooldown_secs: defaults::rate_limit_cooldown(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Metadata fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "defaults::per_season_limit")]
    pub per_season_limit: u32,

    /// Seasons in flight at once
    #[serde(default = "defaults::fetch_concurrency")]
    pub concurrency: usize,

    /// Pause after each season before the worker takes the next one
    #[serde(default = "defaults::fetch_spacing")]
    pub spacing_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            per_season_limit: defaults::per_season_limit(),
            concurrency: defaults::fetch_concurrency(),
            spacing_ms: defaults::fetch_spacing(),
        }
    }
}

/// Cover image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::image_concurrency")]
    pub concurrency: usize,

    #[serde(default = "defaults::image_spacing")]
    pub spacing_ms: u64,

    /// Prefix written into `coverImage` once a file is stored locally
    #[serde(default = "defaults::public_prefix")]
    pub public_prefix: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            concurrency: defaults::image_concurrency(),
            spacing_ms: defaults::image_spacing(),
            public_prefix: defaults::public_prefix(),
        }
    }
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

/// Where the catalog reads a year from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Pre-synced JSON artifacts
    Local,
    /// Live upstream queries
    #[default]
    Remote,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Local => "local",
            DataMode::Remote => "remote",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DataMode::Local),
            "remote" => Ok(DataMode::Remote),
            other => Err(AppError::config(format!("Unknown data mode '{other}'"))),
        }
    }
}

/// Catalog settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub mode: DataMode,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Client defaults
    pub fn endpoint() -> String {
        "https://graphql.anilist.co".into()
    }
    pub fn user_agent() -> String {
        format!("anisync/{}", env!("CARGO_PKG_VERSION"))
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn rate_limit_cooldown() -> u64 {
        60
    }
    pub fn retry_delay() -> u64 {
        1500
    }

    // Fetch defaults
    pub fn per_season_limit() -> u32 {
        20
    }
    pub fn fetch_concurrency() -> usize {
        2
    }
    pub fn fetch_spacing() -> u64 {
        800
    }

    // Image defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn image_concurrency() -> usize {
        3
    }
    pub fn image_spacing() -> u64 {
        300
    }
    pub fn public_prefix() -> String {
        "/data/images".into()
    }

    pub fn data_dir() -> PathBuf {
        PathBuf::from("public/data")
    }

    // Every 6 hours
    pub fn interval() -> u64 {
        6 * 60 * 60
    }

    pub fn level() -> String {
        "info".into()
    }
}
