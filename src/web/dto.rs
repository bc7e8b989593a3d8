//! Data Transfer Objects
//!
//! Request and response types for the JSON endpoints.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogStatus, MangaSource};
use crate::state::ReadMap;
use crate::tracker::MangaEntry;

// ============================================
// MANGA DTOs
// ============================================

/// Catalog with effective read flags
#[derive(Debug, Serialize)]
pub struct MangaListResponse {
    pub total: usize,
    pub pending: usize,
    /// loaded, missing, empty or unreadable
    pub catalog_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    pub items: Vec<MangaEntry>,
}

/// Label and optional reason for a catalog status
pub fn status_label(status: &CatalogStatus) -> (String, Option<String>) {
    match status {
        CatalogStatus::Loaded => ("loaded".to_string(), None),
        CatalogStatus::Missing => ("missing".to_string(), None),
        CatalogStatus::Empty => ("empty".to_string(), None),
        CatalogStatus::Unreadable(reason) => ("unreadable".to_string(), Some(reason.clone())),
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: u64,
    pub is_read: bool,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub total: usize,
    pub changes: ReadMap,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub flushed: usize,
    pub remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub message: String,
}

// ============================================
// SOURCE DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct SourceListResponse {
    pub total: usize,
    pub sources: Vec<MangaSource>,
}

// ============================================
// SETTINGS DTOs
// ============================================

/// Either field may be omitted to leave that theme alone
#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    #[serde(default)]
    pub accent: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
}
