//! # MangaFetch
//!
//! Manga update tracker. An external scraper keeps a JSON catalog of tracked
//! manga up to date; this crate renders it, keeps per-manga read flags, and
//! commits read status and source-list edits back to a GitHub repository.
//!
//! ## Concurrency model
//!
//! There is no server-side lock. Every remote write names the version of the
//! file it read, and the GitHub Contents API rejects it if the file has moved
//! on. A rejected write surfaces as [`TrackerError::VersionConflict`] and
//! leaves local state untouched, so the user can refresh and retry.
//!
//! ## Modules
//!
//! - [`catalog`]: Tracked items and the catalog loader
//! - [`remote`]: Versioned content stores and the read-modify-write protocol
//! - [`state`]: Durable local state (read flags, themes, token)
//! - [`render`]: HTML page and terminal table
//! - [`tracker`]: The controller tying them together
//! - [`web`]: Local web front-end with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mangafetch::config::Config;
//! use mangafetch::tracker::Tracker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Tracker::open(Config::load_default())?;
//!
//!     tracker.mark(42, true)?;
//!     let outcome = tracker.flush().await?;
//!
//!     println!("Committed {} change(s)", outcome.flushed.len());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod remote;
pub mod render;
pub mod state;
pub mod tracker;
pub mod web;

// Re-export top-level types for convenience
pub use catalog::{Catalog, CatalogLoader, CatalogSource, CatalogStatus, MangaSource, TrackedItem};

pub use error::{TrackerError, TrackerResult};

pub use remote::{
    update_remote_json, update_remote_json_array, ContentStore, Credentials, GitHubContentStore,
    MemoryStore, VersionTag,
};

pub use state::{LocalStore, ReadMap, ReadState, ThemeSettings};

pub use tracker::{FlushOutcome, NewSource, Tracker};

pub use config::{Config, ConfigError};
