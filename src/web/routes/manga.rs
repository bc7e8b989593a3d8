//! Manga Routes
//!
//! - GET / - The tracker page
//! - GET /api/v1/manga - Catalog with effective read flags
//! - POST /api/v1/manga/:id/toggle - Flip one read flag locally
//! - GET /api/v1/pending - Uncommitted read changes
//! - POST /api/v1/flush - Commit pending changes to the repository

use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};
use std::sync::Arc;

use crate::render::render_page;
use crate::web::dto::{
    status_label, FlushResponse, MangaListResponse, PendingResponse, ToggleResponse,
};
use crate::web::error::WebResult;
use crate::web::state::AppState;

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> WebResult<Html<String>> {
    let view = state.tracker.view().await?;
    Ok(Html(render_page(&view.catalog, &view.read, &view.theme)))
}

/// GET /api/v1/manga
///
/// An unreadable catalog is not an error: the list is empty and
/// `catalog_status` says why.
pub async fn list_manga(State(state): State<Arc<AppState>>) -> WebResult<Json<MangaListResponse>> {
    let view = state.tracker.view().await?;
    let (catalog_status, catalog_error) = status_label(&view.catalog.status);
    let items = view.entries();

    Ok(Json(MangaListResponse {
        total: items.len(),
        pending: view.read.pending_count(),
        catalog_status,
        catalog_error,
        items,
    }))
}

/// POST /api/v1/manga/:id/toggle
pub async fn toggle_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> WebResult<Json<ToggleResponse>> {
    let is_read = state.tracker.toggle(id).await?;
    let pending = state.tracker.pending()?.len();

    Ok(Json(ToggleResponse {
        id,
        is_read,
        pending,
    }))
}

/// GET /api/v1/pending
pub async fn list_pending(State(state): State<Arc<AppState>>) -> WebResult<Json<PendingResponse>> {
    let changes = state.tracker.pending()?;
    Ok(Json(PendingResponse {
        total: changes.len(),
        changes,
    }))
}

/// POST /api/v1/flush
pub async fn flush(State(state): State<Arc<AppState>>) -> WebResult<Json<FlushResponse>> {
    let outcome = state.tracker.flush().await?;

    let message = if outcome.flushed.is_empty() {
        "No changes to commit.".to_string()
    } else {
        format!(
            "Read status updated for {} manga",
            outcome.flushed.len()
        )
    };

    Ok(Json(FlushResponse {
        flushed: outcome.flushed.len(),
        remaining: outcome.remaining.len(),
        version: outcome.version.map(|v| v.to_string()),
        message,
    }))
}
