//! Batch search handlers: spreadsheet upload in, results or a ZIP out.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use photofinder_core::{
    archive_found_images, ArchiveError, BatchError, BatchResult, TaskStarted, BATCH_ARCHIVE_NAME,
};
use tracing::{info, warn};

use super::handlers::{api_error, ApiError};
use super::upload::read_code_file;
use crate::state::AppState;

/// Search every code in the uploaded spreadsheet and wait for all results.
pub async fn search_batch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, ApiError> {
    let codes = read_code_file(&mut multipart).await?;
    let result = state
        .orchestrator()
        .run_concurrent(codes)
        .await
        .map_err(batch_error)?;
    Ok(Json(result))
}

/// Start a tracked background batch; poll `/progress/{task_id}` for results.
pub async fn search_batch_async(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TaskStarted>, ApiError> {
    let codes = read_code_file(&mut multipart).await?;
    let started = state
        .orchestrator()
        .spawn_tracked(codes)
        .map_err(batch_error)?;
    Ok(Json(started))
}

/// Search the uploaded codes one at a time and return the found images as a ZIP.
pub async fn download_batch_zip(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let codes = read_code_file(&mut multipart).await?;
    let result = state
        .orchestrator()
        .run_sequential(codes)
        .await
        .map_err(batch_error)?;

    let archive = archive_found_images(state.fetcher(), &result.results)
        .await
        .map_err(|e| match e {
            ArchiveError::NothingFetched => api_error(StatusCode::NOT_FOUND, e.to_string()),
            other => {
                warn!(error = %other, "Building batch archive failed");
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Errore nell'elaborazione: {}", other),
                )
            }
        })?;

    info!(
        codes = result.total_codes,
        found = result.found_codes.len(),
        bytes = archive.len(),
        "Batch archive ready"
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", BATCH_ARCHIVE_NAME),
            ),
        ],
        archive,
    ))
}

fn batch_error(error: BatchError) -> ApiError {
    match error {
        BatchError::Empty | BatchError::TooLarge { .. } => {
            api_error(StatusCode::BAD_REQUEST, error.to_string())
        }
        BatchError::Progress(e) => {
            warn!(error = %e, "Batch could not record progress");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
