//! MangaFetch web front-end
//!
//! Serves the tracker page and the JSON endpoints its script calls, built
//! with Axum.
//!
//! # Endpoints
//!
//! ## Page
//! - `GET /` - Rendered tracker table
//!
//! ## Manga
//! - `GET /api/v1/manga` - Catalog with effective read flags
//! - `POST /api/v1/manga/:id/toggle` - Flip a read flag locally
//! - `GET /api/v1/pending` - Uncommitted read changes
//! - `POST /api/v1/flush` - Commit pending changes
//!
//! ## Sources
//! - `GET /api/v1/sources` - List the scraper's sources
//! - `POST /api/v1/sources` - Add a source
//! - `DELETE /api/v1/sources/:id` - Remove a source
//!
//! ## Settings
//! - `PUT /api/v1/theme` - Change themes
//! - `PUT /api/v1/token` / `DELETE /api/v1/token` - Manage the stored token
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Status with uptime

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{WebError, WebResult};
pub use state::AppState;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::WebConfig;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Manga routes
        .route("/manga", get(routes::manga::list_manga))
        .route("/manga/:id/toggle", post(routes::manga::toggle_read))
        .route("/pending", get(routes::manga::list_pending))
        .route("/flush", post(routes::manga::flush))
        // Source routes
        .route("/sources", get(routes::sources::list_sources))
        .route("/sources", post(routes::sources::add_source))
        .route("/sources/:id", delete(routes::sources::remove_source))
        // Settings routes
        .route("/theme", put(routes::settings::set_theme))
        .route("/token", put(routes::settings::set_token))
        .route("/token", delete(routes::settings::clear_token));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::manga::index))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the web server
pub async fn serve(state: AppState, config: &WebConfig) -> Result<(), WebError> {
    let router = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("MangaFetch listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WebError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("MangaFetch shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
