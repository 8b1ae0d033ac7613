//! Service layer.
//!
//! - Season queries against AniList (`AniListClient`)
//! - Cover image localization (`ImageDownloader`)
//! - Year list cache (`AnimeCache`)
//! - Data-mode routing and the read entry points (`AnimeCatalog`)

pub mod anilist;
pub mod cache;
pub mod catalog;
pub mod images;

pub use anilist::{AniListClient, SeasonSource};
pub use cache::{AnimeCache, YearList, cache_key};
pub use catalog::{AnimeCatalog, CatalogStats};
pub use images::{HttpImageSource, ImageDownloader, ImageReport, ImageSource};
