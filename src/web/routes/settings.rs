//! Settings Routes
//!
//! - PUT /api/v1/theme - Change accent and/or background theme
//! - PUT /api/v1/token - Store the GitHub token locally
//! - DELETE /api/v1/token - Forget the stored token

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::state::ThemeSettings;
use crate::web::dto::{ThemeRequest, TokenRequest};
use crate::web::error::WebResult;
use crate::web::state::AppState;

/// PUT /api/v1/theme
pub async fn set_theme(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ThemeRequest>,
) -> WebResult<Json<ThemeSettings>> {
    let theme = state
        .tracker
        .set_theme(req.accent.as_deref(), req.background.as_deref())?;
    Ok(Json(theme))
}

/// PUT /api/v1/token
pub async fn set_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> WebResult<StatusCode> {
    state.tracker.set_token(&req.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/token
pub async fn clear_token(State(state): State<Arc<AppState>>) -> WebResult<StatusCode> {
    state.tracker.clear_token()?;
    Ok(StatusCode::NO_CONTENT)
}
