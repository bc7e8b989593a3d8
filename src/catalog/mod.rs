//! Manga Catalog
//!
//! The catalog is the JSON array of tracked manga produced by the external
//! scraper. This module defines its records and loads it from a URL or path.

mod loader;
mod types;

pub use loader::{
    cache_busted_url, parse_catalog, Catalog, CatalogLoader, CatalogSource, CatalogStatus,
};
pub(crate) use loader::json_kind;
pub use types::{parse_timestamp, LatestChapter, MangaSource, TrackedItem};
