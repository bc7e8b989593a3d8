//! Core data types for the manga catalog
//!
//! - `TrackedItem`: one manga as produced by the external scraper
//! - `LatestChapter`: the newest chapter the scraper saw
//! - `MangaSource`: one entry of the scraper's source list
//!
//! The catalog file has been written by several generations of scripts, so
//! deserialization goes through a lenient raw form that accepts the older
//! field names. Serialization always emits the canonical camelCase shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tracked manga
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawTrackedItem")]
pub struct TrackedItem {
    /// Unique identifier assigned by the scraper
    pub id: u64,
    /// Display title
    pub title: String,
    /// Page the scraper reads chapters from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Newest chapter seen by the scraper
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_chapter: Option<LatestChapter>,
    /// When the scraper last checked this manga
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Read flag as recorded in the catalog file
    pub is_read: bool,
}

impl TrackedItem {
    /// Create an item with only the required fields
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            source_url: None,
            latest_chapter: None,
            last_updated_at: None,
            is_read: false,
        }
    }

    /// Builder method: set the source page
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Builder method: set the latest chapter
    pub fn chapter(mut self, text: impl Into<String>, url: Option<String>) -> Self {
        self.latest_chapter = Some(LatestChapter {
            text: text.into(),
            url,
        });
        self
    }

    /// Builder method: set the last check time
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated_at = Some(at);
        self
    }

    /// Builder method: set the catalog read flag
    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }
}

/// The newest chapter of a manga
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LatestChapter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One record of the scraper's source list (`manga_sources.json`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MangaSource {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub selector: String,
    #[serde(default)]
    pub use_xpath: bool,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl MangaSource {
    /// Human-readable selector kind
    pub fn selector_kind(&self) -> &'static str {
        if self.use_xpath {
            "XPath"
        } else {
            "CSS Selector"
        }
    }
}

// ============================================
// Lenient input form
// ============================================

// Each historical spelling is its own field so a record carrying several of
// them still parses; the first non-empty one wins.
#[derive(Debug, Deserialize)]
struct RawTrackedItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "sourceUrl")]
    source_url_camel: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "latestChapter")]
    latest_chapter: Option<RawChapter>,
    #[serde(default)]
    latest_chapter_text: Option<String>,
    #[serde(default)]
    latest_chapter_url: Option<String>,
    #[serde(default, rename = "lastUpdatedAt")]
    last_updated_at: Option<String>,
    #[serde(default, rename = "lastUpdated")]
    last_updated: Option<String>,
    #[serde(default)]
    last_scraped_at: Option<String>,
    #[serde(default, rename = "isRead")]
    is_read: bool,
}

fn first_present(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChapter {
    Text(String),
    Link {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl From<RawTrackedItem> for TrackedItem {
    fn from(raw: RawTrackedItem) -> Self {
        let latest_chapter = match raw.latest_chapter {
            Some(RawChapter::Text(text)) => Some(LatestChapter {
                text,
                url: raw.latest_chapter_url,
            }),
            Some(RawChapter::Link { text, url }) => Some(LatestChapter {
                text: text.unwrap_or_else(|| "N/A".to_string()),
                url,
            }),
            None => match (raw.latest_chapter_text, raw.latest_chapter_url) {
                (None, None) => None,
                (text, url) => Some(LatestChapter {
                    text: text.unwrap_or_else(|| "N/A".to_string()),
                    url,
                }),
            },
        };

        Self {
            id: raw.id,
            title: first_present([raw.title, raw.name]).unwrap_or_else(|| "N/A".to_string()),
            source_url: first_present([raw.source_url_camel, raw.source_url, raw.url]),
            latest_chapter,
            last_updated_at: first_present([
                raw.last_updated_at,
                raw.last_updated,
                raw.last_scraped_at,
            ])
            .as_deref()
            .and_then(parse_timestamp),
            is_read: raw.is_read,
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_shape() {
        let json = r#"{
            "id": 3,
            "title": "Frieren",
            "sourceUrl": "https://example.com/frieren",
            "latestChapter": {"text": "Chapter 130", "url": "https://example.com/frieren/130"},
            "lastUpdatedAt": "2024-05-01T10:00:00Z",
            "isRead": true
        }"#;

        let item: TrackedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(item.title, "Frieren");
        assert_eq!(item.source_url.as_deref(), Some("https://example.com/frieren"));
        assert_eq!(item.latest_chapter.as_ref().unwrap().text, "Chapter 130");
        assert_eq!(
            item.last_updated_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert!(item.is_read);
    }

    #[test]
    fn test_scraper_shape() {
        // Scraper output: bare chapter string, naive timestamp, `url`
        let json = r#"{
            "id": 1,
            "title": "One Piece",
            "latestChapter": "Chapter 1100",
            "url": "https://example.com/op",
            "lastUpdated": "2024-05-01T10:00:00.123456",
            "isRead": false
        }"#;

        let item: TrackedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.source_url.as_deref(), Some("https://example.com/op"));
        assert_eq!(
            item.latest_chapter,
            Some(LatestChapter {
                text: "Chapter 1100".into(),
                url: None
            })
        );
        assert!(item.last_updated_at.is_some());
    }

    #[test]
    fn test_flat_shape() {
        let json = r#"{
            "id": 7,
            "name": "Dandadan",
            "source_url": "https://example.com/dan",
            "latest_chapter_text": "Ch. 150",
            "latest_chapter_url": "https://example.com/dan/150",
            "last_scraped_at": "not a date"
        }"#;

        let item: TrackedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "Dandadan");
        let chapter = item.latest_chapter.unwrap();
        assert_eq!(chapter.text, "Ch. 150");
        assert_eq!(chapter.url.as_deref(), Some("https://example.com/dan/150"));
        assert_eq!(item.last_updated_at, None);
        assert!(!item.is_read);
    }

    #[test]
    fn test_several_spellings_of_one_field() {
        let json = r#"{
            "id": 8,
            "name": "Dandadan",
            "url": "https://example.com/legacy",
            "sourceUrl": "https://example.com/dandadan",
            "lastUpdated": "",
            "last_scraped_at": "2024-06-02T08:30:00"
        }"#;

        let item: TrackedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "Dandadan");
        assert_eq!(item.source_url.as_deref(), Some("https://example.com/dandadan"));
        assert_eq!(
            item.last_updated_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_serializes_canonical_camel_case() {
        let item = TrackedItem::new(2, "Blue Lock").chapter("Ch. 1", None);
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["title"], "Blue Lock");
        assert_eq!(value["latestChapter"]["text"], "Ch. 1");
        assert_eq!(value["isRead"], false);
        assert!(value.get("sourceUrl").is_none());

        let back: TrackedItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_source_defaults() {
        let source: MangaSource = serde_json::from_str(
            r#"{"id": 1, "name": "A", "url": "https://a", "selector": ".ch"}"#,
        )
        .unwrap();
        assert!(source.is_active);
        assert!(!source.use_xpath);
        assert_eq!(source.selector_kind(), "CSS Selector");

        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["isActive"], true);
        assert_eq!(value["use_xpath"], false);
    }
}
