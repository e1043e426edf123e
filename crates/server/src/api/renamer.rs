//! Photo renaming handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use photofinder_core::renamer::{MappingListing, RefreshReport, RenameReport};
use photofinder_core::{MappingError, RenameError};
use serde::Deserialize;
use tracing::warn;

use super::handlers::{api_error, ApiError};
use super::upload::read_images;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub force: bool,
}

pub async fn list_mappings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MappingListing>, ApiError> {
    state
        .renamer()
        .refresher()
        .listing()
        .map(Json)
        .map_err(mapping_error)
}

/// Re-download the mapping spreadsheet. `?force=true` reloads even if unchanged.
pub async fn refresh_mappings(
    State(state): State<Arc<AppState>>,
    Query(request): Query<RefreshRequest>,
) -> Result<Json<RefreshReport>, ApiError> {
    state
        .renamer()
        .refresher()
        .refresh(request.force)
        .await
        .map(Json)
        .map_err(mapping_error)
}

/// Rename uploaded photos by their code.
pub async fn rename(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<RenameReport>, ApiError> {
    let files = read_images(&mut multipart).await?;
    state
        .renamer()
        .rename(files)
        .await
        .map(Json)
        .map_err(rename_error)
}

/// Download the renamed photos of a session. The session is consumed.
pub async fn rename_zip(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, bytes) = state.renamer().archive(&session_id).map_err(rename_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    ))
}

fn mapping_error(error: MappingError) -> ApiError {
    match error {
        MappingError::NotConfigured => api_error(StatusCode::SERVICE_UNAVAILABLE, error.to_string()),
        MappingError::Fetch(_) => {
            warn!(error = %error, "Mapping spreadsheet download failed");
            api_error(StatusCode::BAD_GATEWAY, error.to_string())
        }
        MappingError::Parse(_) => api_error(StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        MappingError::Database(_) => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

fn rename_error(error: RenameError) -> ApiError {
    match error {
        RenameError::NoFiles | RenameError::NoMappings => {
            api_error(StatusCode::BAD_REQUEST, error.to_string())
        }
        RenameError::SessionNotFound(_) => api_error(StatusCode::NOT_FOUND, error.to_string()),
        RenameError::Mapping(e) => mapping_error(e),
        RenameError::Archive(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
