use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use photofinder_core::progress::get_snapshot;
use photofinder_core::{ProgressError, ProgressSnapshot};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Current state of a tracked batch task.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    get_snapshot(state.progress_store(), &task_id)
        .map(Json)
        .map_err(|e| match e {
            ProgressError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "Task non trovato"),
            other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })
}
