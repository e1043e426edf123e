//! Renaming workflow types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::origin::FetchError;
use crate::spreadsheet::SpreadsheetError;

/// One row of the mapping spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub code: String,
    pub new_name: String,
}

/// Current mapping table plus refresh metadata.
#[derive(Debug, Clone, Serialize)]
pub struct MappingListing {
    pub mappings: Vec<Mapping>,
    pub total: usize,
    pub last_updated: Option<String>,
    pub file_hash: Option<String>,
}

/// Result of checking the mapping spreadsheet for changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub updated: bool,
    pub total: usize,
    /// Change in mapping count against the previous table.
    pub delta: i64,
    pub message: String,
}

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameStatus {
    Success,
    Error,
}

/// Per-file line of the rename report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub original_name: String,
    /// The renamed file, or the original name when renaming failed.
    pub new_name: String,
    pub status: RenameStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameReport {
    pub results: Vec<RenameOutcome>,
    pub success_count: usize,
    pub error_count: usize,
    pub zip_ready: bool,
    /// Present when at least one file was renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("URL del file di mappatura non configurato")]
    NotConfigured,

    #[error("Download del file di mappatura fallito: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] SpreadsheetError),

    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Nessun file caricato")]
    NoFiles,

    #[error("Nessuna mappatura Excel disponibile")]
    NoMappings,

    #[error("Sessione non trovata o scaduta: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
