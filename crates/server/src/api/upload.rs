//! Multipart form readers shared by the upload endpoints.

use axum::extract::Multipart;
use axum::http::StatusCode;
use photofinder_core::{spreadsheet, SpreadsheetError, UploadedFile};

use super::handlers::{api_error, ApiError};

const NO_FILE_MESSAGE: &str = "Nessun file caricato";

/// Read the `file` field and extract its product codes.
///
/// Every spreadsheet problem is a client error.
pub async fn read_code_file(multipart: &mut Multipart) -> Result<Vec<String>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = next_field(multipart).await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Impossibile leggere il file: {}", e),
            )
        })?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE))?;
    spreadsheet::read_codes(&filename, &bytes).map_err(spreadsheet_error)
}

/// Read every `images` field as an uploaded photo.
pub async fn read_images(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = next_field(multipart).await? {
        if !matches!(field.name(), Some("images") | Some("images[]")) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Impossibile leggere il file {}: {}", name, e),
            )
        })?;
        files.push(UploadedFile::new(name, bytes.to_vec()));
    }

    Ok(files)
}

async fn next_field<'a>(
    multipart: &'a mut Multipart,
) -> Result<Option<axum::extract::multipart::Field<'a>>, ApiError> {
    multipart.next_field().await.map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Richiesta multipart non valida: {}", e),
        )
    })
}

fn spreadsheet_error(error: SpreadsheetError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, error.to_string())
}
