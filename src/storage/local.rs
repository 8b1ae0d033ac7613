//! Local filesystem storage implementation.
//!
//! Every write goes to a temporary sibling first and is then renamed into
//! place, so readers never observe a half-written artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Anime, SyncMeta, YearIndex};
use crate::storage::{ArtifactStorage, IMAGE_DIR, INDEX_KEY, SYNC_META_KEY, year_key};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Stored image file names, skipping unfinished `.tmp` writes.
    async fn image_names(&self) -> Result<Vec<String>> {
        let dir = self.path(IMAGE_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".tmp") {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ArtifactStorage for LocalStorage {
    async fn year_exists(&self, year: i32) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(&year_key(year))).await?)
    }

    async fn load_year(&self, year: i32) -> Result<Option<Vec<Anime>>> {
        self.read_json(&year_key(year)).await
    }

    async fn write_year(&self, year: i32, anime: &[Anime]) -> Result<()> {
        let key = year_key(year);
        self.write_json(&key, anime).await?;
        log::info!("{} entries written to {}", anime.len(), key);
        Ok(())
    }

    async fn load_index(&self) -> Result<Option<YearIndex>> {
        self.read_json(INDEX_KEY).await
    }

    async fn write_index(&self, index: &YearIndex) -> Result<()> {
        self.write_json(INDEX_KEY, index).await
    }

    async fn load_sync_meta(&self) -> Result<Option<SyncMeta>> {
        self.read_json(SYNC_META_KEY).await
    }

    async fn write_sync_meta(&self, meta: &SyncMeta) -> Result<()> {
        self.write_json(SYNC_META_KEY, meta).await
    }

    async fn find_image(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .image_names()
            .await?
            .into_iter()
            .find(|name| name.split_once('.').is_some_and(|(stem, _)| stem == id)))
    }

    async fn list_images(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .image_names()
            .await?
            .into_iter()
            .filter_map(|name| {
                let (stem, _) = name.split_once('.')?;
                Some((stem.to_string(), name))
            })
            .collect())
    }

    async fn write_image(&self, id: &str, ext: &str, bytes: &[u8]) -> Result<String> {
        let name = format!("{}.{}", id, ext);
        self.write_bytes(&format!("{}/{}", IMAGE_DIR, name), bytes)
            .await?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Season, sample_anime};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
        assert!(storage.load_year(1999).await.unwrap().is_none());
        assert!(!storage.year_exists(1999).await.unwrap());
    }

    #[tokio::test]
    async fn test_year_round_trip_uses_camel_case() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let list = vec![sample_anime("7", Some(Season::Spring), 9)];

        storage.write_year(2024, &list).await.unwrap();

        assert!(storage.year_exists(2024).await.unwrap());
        let raw = std::fs::read_to_string(tmp.path().join("anime-2024.json")).unwrap();
        assert!(raw.contains("\"coverImage\""));
        assert!(raw.contains("\"seasonYear\""));
        assert_eq!(storage.load_year(2024).await.unwrap(), Some(list));
    }

    #[tokio::test]
    async fn test_corrupt_year_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        std::fs::write(tmp.path().join("anime-2020.json"), "{not json").unwrap();

        assert!(matches!(
            storage.load_year(2020).await,
            Err(AppError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_find_image_any_extension() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.find_image("42").await.unwrap(), None);
        let name = storage.write_image("42", "png", b"\x89PNG").await.unwrap();
        assert_eq!(name, "42.png");
        assert_eq!(storage.find_image("42").await.unwrap(), Some(name));
        assert_eq!(storage.find_image("4").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_images_maps_ids_to_files() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.list_images().await.unwrap().is_empty());

        storage.write_image("42", "png", b"\x89PNG").await.unwrap();
        storage.write_image("7", "jpg", b"\xff\xd8").await.unwrap();
        std::fs::write(tmp.path().join("images/9.jpg.tmp"), b"partial").unwrap();

        let images = storage.list_images().await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images.get("42").map(String::as_str), Some("42.png"));
        assert_eq!(images.get("7").map(String::as_str), Some("7.jpg"));
        assert!(!images.contains_key("9"));
    }

    #[tokio::test]
    async fn test_sync_meta_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.load_sync_meta().await.unwrap().is_none());

        let meta = SyncMeta::new(2026, Season::Fall);
        storage.write_sync_meta(&meta).await.unwrap();
        assert_eq!(storage.load_sync_meta().await.unwrap(), Some(meta));
    }
}
