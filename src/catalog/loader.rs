//! Catalog loader
//!
//! Fetches the scraper's output file from a URL or a local path. A missing or
//! unreadable catalog never blocks rendering: every failure degrades to an
//! empty item list plus a [`CatalogStatus`] describing what went wrong.

use super::types::TrackedItem;
use crate::error::{TrackerError, TrackerResult};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// Where the catalog lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Fetched over HTTP with a cache-defeating query parameter
    Url(String),
    /// Read from the local filesystem
    File(PathBuf),
}

impl CatalogSource {
    /// Interpret a configured location: `http(s)://` is a URL, anything else a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            CatalogSource::Url(location.to_string())
        } else {
            CatalogSource::File(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::Url(url) => write!(f, "{}", url),
            CatalogSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Outcome of a catalog load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Parsed successfully
    Loaded,
    /// Not found (404 or no such file); nothing tracked yet
    Missing,
    /// Present but empty
    Empty,
    /// Present but could not be read or parsed
    Unreadable(String),
}

/// A loaded catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    pub items: Vec<TrackedItem>,
    pub status: CatalogStatus,
    pub fetched_at: DateTime<Utc>,
}

impl Catalog {
    fn degraded(status: CatalogStatus) -> Self {
        Self {
            items: Vec::new(),
            status,
            fetched_at: Utc::now(),
        }
    }

    /// Look up an item by id
    pub fn get(&self, id: u64) -> Option<&TrackedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Loads the catalog from its configured source
pub struct CatalogLoader {
    client: Client,
    source: CatalogSource,
}

impl CatalogLoader {
    /// Create a loader with the given request timeout
    pub fn new(source: CatalogSource, timeout_secs: u64) -> TrackerResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("mangafetch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, source })
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Load the catalog, degrading every failure to an empty list
    pub async fn load(&self) -> Catalog {
        let text = match &self.source {
            CatalogSource::Url(url) => self.fetch_url(url).await,
            CatalogSource::File(path) => read_file(path).await,
        };

        let text = match text {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!(source = %self.source, "Catalog not found, assuming empty list");
                return Catalog::degraded(CatalogStatus::Missing);
            }
            Err(e) => {
                tracing::error!(source = %self.source, error = %e, "Failed to fetch catalog");
                return Catalog::degraded(CatalogStatus::Unreadable(e.to_string()));
            }
        };

        if text.trim().is_empty() {
            tracing::warn!(source = %self.source, "Catalog is empty");
            return Catalog::degraded(CatalogStatus::Empty);
        }

        match parse_catalog(&text) {
            Ok(items) => {
                tracing::debug!(source = %self.source, count = items.len(), "Catalog loaded");
                Catalog {
                    items,
                    status: CatalogStatus::Loaded,
                    fetched_at: Utc::now(),
                }
            }
            Err(e) => {
                tracing::error!(source = %self.source, error = %e, "Catalog is not valid JSON");
                Catalog::degraded(CatalogStatus::Unreadable(e.to_string()))
            }
        }
    }

    async fn fetch_url(&self, url: &str) -> TrackerResult<Option<String>> {
        let url = cache_busted_url(url, Utc::now().timestamp_millis());
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(TrackerError::from_read_status(
                &self.source.to_string(),
                response.status().as_u16(),
            ));
        }

        Ok(Some(response.text().await?))
    }
}

async fn read_file(path: &std::path::Path) -> TrackerResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Append the `v=<millis>` cache-defeating parameter
pub fn cache_busted_url(url: &str, now_millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}v={}", url, separator, now_millis)
}

/// Parse catalog text into items
///
/// The document must be a JSON array. Individual records that cannot be
/// interpreted (no numeric id, for instance) are skipped with a warning.
pub fn parse_catalog(text: &str) -> TrackerResult<Vec<TrackedItem>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(text)?;
    let records = match value {
        serde_json::Value::Array(records) => records,
        other => {
            return Err(TrackerError::LocalParse(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut items = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<TrackedItem>(record) {
            Ok(item) => items.push(item),
            Err(e) => tracing::warn!(index, error = %e, "Skipping unreadable catalog record"),
        }
    }

    Ok(items)
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
