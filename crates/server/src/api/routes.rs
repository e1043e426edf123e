use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{batch, handlers, progress, renamer, search};
use crate::state::AppState;

/// Upper bound for uploaded spreadsheets and photo batches.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Single search
        .route("/search-single", post(search::search_single))
        .route("/download-image", get(search::download_image))
        // Batch search
        .route("/search-batch", post(batch::search_batch))
        .route("/search-batch-async", post(batch::search_batch_async))
        .route("/download-batch-zip", post(batch::download_batch_zip))
        .route("/progress/{task_id}", get(progress::get_progress))
        // Renamer
        .route("/mappings", get(renamer::list_mappings))
        .route("/mappings/refresh", post(renamer::refresh_mappings))
        .route("/rename", post(renamer::rename))
        .route("/rename/{session_id}/zip", get(renamer::rename_zip));

    Router::new()
        .route("/api/", get(handlers::root))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
