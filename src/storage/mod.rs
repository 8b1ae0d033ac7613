//! Storage abstractions for synced artifacts.
//!
//! ## Directory Structure
//!
//! ```text
//! public/data/
//! ├── index.json            # Known years, seasons and the active limit
//! ├── sync-meta.json        # Last synced year/season marker
//! ├── anime-2024.json       # One artifact per year
//! └── images/
//!     ├── 154587.jpg        # One cover per anime id
//!     └── 163134.png
//! ```

pub mod local;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Anime, SyncMeta, YearIndex};

// Re-export for convenience
pub use local::LocalStorage;

/// Key of the per-year artifact.
pub fn year_key(year: i32) -> String {
    format!("anime-{}.json", year)
}

pub const INDEX_KEY: &str = "index.json";
pub const SYNC_META_KEY: &str = "sync-meta.json";
pub const IMAGE_DIR: &str = "images";

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Whether an artifact for `year` has been written.
    async fn year_exists(&self, year: i32) -> Result<bool>;

    /// Load a year artifact. `Ok(None)` when it does not exist; a parse
    /// failure is an error.
    async fn load_year(&self, year: i32) -> Result<Option<Vec<Anime>>>;

    /// Write a year artifact, replacing any previous one.
    async fn write_year(&self, year: i32, anime: &[Anime]) -> Result<()>;

    async fn load_index(&self) -> Result<Option<YearIndex>>;

    async fn write_index(&self, index: &YearIndex) -> Result<()>;

    async fn load_sync_meta(&self) -> Result<Option<SyncMeta>>;

    async fn write_sync_meta(&self, meta: &SyncMeta) -> Result<()>;

    /// File name of a stored cover for `id`, whatever its extension.
    async fn find_image(&self, id: &str) -> Result<Option<String>>;

    /// Every stored cover, keyed by id, from one listing of the image dir.
    async fn list_images(&self) -> Result<HashMap<String, String>>;

    /// Store a cover as `{id}.{ext}` and return the file name.
    async fn write_image(&self, id: &str, ext: &str, bytes: &[u8]) -> Result<String>;
}
