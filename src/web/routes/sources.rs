//! Source Routes
//!
//! The scraper's source list, edited in the repository.
//!
//! - GET /api/v1/sources - List sources
//! - POST /api/v1/sources - Add a source
//! - DELETE /api/v1/sources/:id - Remove a source

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::catalog::MangaSource;
use crate::tracker::NewSource;
use crate::web::dto::SourceListResponse;
use crate::web::error::WebResult;
use crate::web::state::AppState;

/// GET /api/v1/sources
pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> WebResult<Json<SourceListResponse>> {
    let sources = state.tracker.list_sources().await?;
    Ok(Json(SourceListResponse {
        total: sources.len(),
        sources,
    }))
}

/// POST /api/v1/sources
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSource>,
) -> WebResult<(StatusCode, Json<MangaSource>)> {
    let source = state.tracker.add_source(req).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// DELETE /api/v1/sources/:id
pub async fn remove_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> WebResult<StatusCode> {
    state.tracker.remove_source(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
