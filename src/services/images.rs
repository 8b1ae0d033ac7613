//! Cover image downloader for the offline sync.
//!
//! Each cover is stored once per anime id. A cover already on disk is
//! reused without touching the network, and the record is pointed at the
//! local copy either way. Download failures keep the remote URL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Anime, ImageConfig};
use crate::storage::ArtifactStorage;
use crate::utils::http::extension_from_content_type;
use crate::utils::run_with_limit;

/// Extension used when the server does not say what it sent.
const FALLBACK_EXTENSION: &str = "jpg";

/// Downloaded image bytes.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub extension: Option<String>,
}

/// Something that can fetch an image by URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<ImagePayload>;
}

/// Plain HTTP GET image source.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self, url: &str) -> Result<ImagePayload> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                body: format!("image fetch failed for {url}"),
            });
        }
        let extension = extension_from_content_type(res.headers());
        let bytes = res.bytes().await?.to_vec();
        Ok(ImagePayload { bytes, extension })
    }
}

/// What happened to one record's cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Downloaded,
    AlreadyPresent,
    NoUrl,
    Failed,
}

/// Totals for one download pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub downloaded: usize,
    pub already_present: usize,
    pub no_url: usize,
    pub failed: usize,
}

impl ImageReport {
    fn record(&mut self, status: ImageStatus) {
        match status {
            ImageStatus::Downloaded => self.downloaded += 1,
            ImageStatus::AlreadyPresent => self.already_present += 1,
            ImageStatus::NoUrl => self.no_url += 1,
            ImageStatus::Failed => self.failed += 1,
        }
    }
}

/// Downloads covers into storage and rewrites records to local paths.
pub struct ImageDownloader<'a> {
    storage: &'a dyn ArtifactStorage,
    source: &'a dyn ImageSource,
    config: ImageConfig,
}

impl<'a> ImageDownloader<'a> {
    pub fn new(
        storage: &'a dyn ArtifactStorage,
        source: &'a dyn ImageSource,
        config: &ImageConfig,
    ) -> Self {
        Self {
            storage,
            source,
            config: config.clone(),
        }
    }

    /// Localize covers for every record, preserving order.
    ///
    /// The image directory is listed once for the whole pass.
    pub async fn localize_all(&self, list: Vec<Anime>) -> (Vec<Anime>, ImageReport) {
        let total = list.len();
        let existing = match self.storage.list_images().await {
            Ok(existing) => existing,
            Err(e) => {
                log::warn!("[Image] listing stored covers failed: {}", e);
                HashMap::new()
            }
        };
        let tasks: Vec<_> = list
            .into_iter()
            .map(|anime| {
                let found = existing.get(&anime.id).cloned();
                move || self.localize_with(anime, found)
            })
            .collect();

        let results = run_with_limit(
            tasks,
            self.config.concurrency,
            Duration::from_millis(self.config.spacing_ms),
            None,
        )
        .await;

        let mut report = ImageReport::default();
        let mut out = Vec::with_capacity(total);
        for (anime, status) in results {
            report.record(status);
            out.push(anime);
        }
        log::info!(
            "Images: {} downloaded, {} already present, {} failed, {} without URL",
            report.downloaded,
            report.already_present,
            report.failed,
            report.no_url
        );
        (out, report)
    }

    /// Localize one record's cover.
    pub async fn localize(&self, anime: Anime) -> (Anime, ImageStatus) {
        let existing = match self.storage.find_image(&anime.id).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("[Image] {}: existence check failed: {}", anime.id, e);
                None
            }
        };
        self.localize_with(anime, existing).await
    }

    /// Localize one record given the stored file name for its id, if any.
    async fn localize_with(
        &self,
        mut anime: Anime,
        existing: Option<String>,
    ) -> (Anime, ImageStatus) {
        if let Some(name) = existing {
            self.point_to_local(&mut anime, &name);
            return (anime, ImageStatus::AlreadyPresent);
        }

        let url = [&anime.cover_image.extra_large, &anime.cover_image.large]
            .into_iter()
            .find(|u| !u.is_empty() && !u.starts_with(&self.config.public_prefix))
            .cloned();
        let Some(url) = url else {
            return (anime, ImageStatus::NoUrl);
        };

        let status = match self.download(&anime.id, &url).await {
            Ok(name) => {
                self.point_to_local(&mut anime, &name);
                log::debug!("[Image] {} -> {}", anime.id, name);
                ImageStatus::Downloaded
            }
            Err(e) => {
                log::warn!("[Image] {}: {}", anime.id, e);
                ImageStatus::Failed
            }
        };
        (anime, status)
    }

    async fn download(&self, id: &str, url: &str) -> Result<String> {
        let payload = self.source.fetch_image(url).await?;
        let ext = payload.extension.as_deref().unwrap_or(FALLBACK_EXTENSION);
        self.storage.write_image(id, ext, &payload.bytes).await
    }

    fn point_to_local(&self, anime: &mut Anime, file_name: &str) {
        let path = format!(
            "{}/{}",
            self.config.public_prefix.trim_end_matches('/'),
            file_name
        );
        anime.cover_image.extra_large = path.clone();
        anime.cover_image.large = path;
    }
}
