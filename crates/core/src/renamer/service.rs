//! Renames uploaded photos according to the mapping table.

use std::sync::Arc;
use tracing::{debug, info};

use crate::archive::ZipBuilder;
use crate::config::RenamerConfig;

use super::refresher::MappingRefresher;
use super::session::RenameSessionStore;
use super::store::MappingStore;
use super::types::{RenameError, RenameOutcome, RenameReport, RenameStatus, UploadedFile};

const UNSUPPORTED_FORMAT_MESSAGE: &str = "Formato file non supportato";
const RENAMED_MESSAGE: &str = "Rinominato con successo";

/// Renames photos named `{code}.{ext}` to `{mapped name}.{ext}`.
#[derive(Clone)]
pub struct Renamer {
    store: Arc<dyn MappingStore>,
    refresher: MappingRefresher,
    sessions: Arc<RenameSessionStore>,
    allowed_extensions: Vec<String>,
}

impl Renamer {
    pub fn new(
        store: Arc<dyn MappingStore>,
        refresher: MappingRefresher,
        sessions: Arc<RenameSessionStore>,
        config: &RenamerConfig,
    ) -> Self {
        Self {
            store,
            refresher,
            sessions,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn refresher(&self) -> &MappingRefresher {
        &self.refresher
    }

    /// Rename every file it can. Per-file problems are reported in the
    /// result list; renamed files are kept in a new session for download.
    pub async fn rename(&self, files: Vec<UploadedFile>) -> Result<RenameReport, RenameError> {
        if files.is_empty() {
            return Err(RenameError::NoFiles);
        }
        if self.refresher.ensure_loaded().await? == 0 {
            return Err(RenameError::NoMappings);
        }

        let mut results = Vec::with_capacity(files.len());
        let mut renamed = Vec::new();

        for file in files {
            let outcome = self.rename_one(&file)?;
            if outcome.status == RenameStatus::Success {
                renamed.push((outcome.new_name.clone(), file.bytes));
            }
            results.push(outcome);
        }

        let success_count = renamed.len();
        let error_count = results.len() - success_count;
        let session_id = (success_count > 0).then(|| self.sessions.insert(renamed));

        info!(
            success = success_count,
            errors = error_count,
            session_id = session_id.as_deref().unwrap_or("-"),
            "Rename finished"
        );

        Ok(RenameReport {
            results,
            success_count,
            error_count,
            zip_ready: success_count > 0,
            session_id,
        })
    }

    fn rename_one(&self, file: &UploadedFile) -> Result<RenameOutcome, RenameError> {
        let original_name = file.name.clone();
        let (base, extension) = split_name(&file.name);

        let Some(extension) = extension.filter(|e| self.allowed_extensions.contains(e)) else {
            return Ok(failed(original_name, UNSUPPORTED_FORMAT_MESSAGE.to_string()));
        };

        match self.store.get(base)? {
            Some(mapped) => {
                let new_name = format!("{}.{}", mapped, extension);
                debug!(original = %original_name, new_name = %new_name, "Renamed");
                Ok(RenameOutcome {
                    original_name,
                    new_name,
                    status: RenameStatus::Success,
                    message: RENAMED_MESSAGE.to_string(),
                })
            }
            None => Ok(failed(
                original_name,
                format!("Codice \"{}\" non trovato nel file Excel", base),
            )),
        }
    }

    /// Consume a session and pack its files.
    /// Returns the archive name and bytes.
    pub fn archive(&self, session_id: &str) -> Result<(String, Vec<u8>), RenameError> {
        let files = self
            .sessions
            .take(session_id)
            .ok_or_else(|| RenameError::SessionNotFound(session_id.to_string()))?;

        let mut zip = ZipBuilder::new();
        for (name, bytes) in &files {
            zip.add(name, bytes)?;
        }
        let prefix: String = session_id.chars().take(8).collect();
        Ok((format!("foto_rinominate_{}.zip", prefix), zip.finish()?))
    }
}

fn failed(original_name: String, message: String) -> RenameOutcome {
    RenameOutcome {
        new_name: original_name.clone(),
        original_name,
        status: RenameStatus::Error,
        message,
    }
}

/// Split an uploaded name into base name and lowercased extension,
/// ignoring any client-side directory.
fn split_name(name: &str) -> (&str, Option<String>) {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(dot) if dot > 0 => (&file[..dot], Some(file[dot + 1..].to_ascii_lowercase())),
        _ => (file, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renamer::SqliteMappingStore;
    use crate::testing::MockOrigin;
    use std::io::{Cursor, Read};
    use std::time::Duration;

    fn renamer_with(mappings: &[(&str, &str)]) -> Renamer {
        let store = Arc::new(SqliteMappingStore::in_memory().unwrap());
        let rows: Vec<_> = mappings
            .iter()
            .map(|(c, n)| (c.to_string(), n.to_string()))
            .collect();
        store.replace_all(&rows).unwrap();

        let origin = Arc::new(MockOrigin::new("https://origin.test/img"));
        let refresher = MappingRefresher::new(store.clone(), origin, None);
        let sessions = Arc::new(RenameSessionStore::new(Duration::from_secs(3600)));
        Renamer::new(store, refresher, sessions, &RenamerConfig::default())
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("24369.JPG"), ("24369", Some("jpg".to_string())));
        assert_eq!(split_name("a.b.png"), ("a.b", Some("png".to_string())));
        assert_eq!(split_name("C:\\foto\\117.jpeg"), ("117", Some("jpeg".to_string())));
        assert_eq!(split_name("noext"), ("noext", None));
        assert_eq!(split_name(".hidden"), (".hidden", None));
    }

    #[tokio::test]
    async fn test_rename_mixed_batch() {
        let renamer = renamer_with(&[("24369", "TAZZA-BLU"), ("117", "PIATTO")]);

        let report = renamer
            .rename(vec![
                UploadedFile::new("24369.JPG", vec![1]),
                UploadedFile::new("117.gif", vec![2]),
                UploadedFile::new("999.png", vec![3]),
            ])
            .await
            .unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 2);
        assert!(report.zip_ready);
        assert!(report.session_id.is_some());

        assert_eq!(report.results[0].new_name, "TAZZA-BLU.jpg");
        assert_eq!(report.results[0].status, RenameStatus::Success);
        assert_eq!(report.results[1].message, UNSUPPORTED_FORMAT_MESSAGE);
        assert_eq!(report.results[1].new_name, "117.gif");
        assert_eq!(
            report.results[2].message,
            "Codice \"999\" non trovato nel file Excel"
        );
    }

    #[tokio::test]
    async fn test_no_mappings() {
        let renamer = renamer_with(&[]);
        let err = renamer
            .rename(vec![UploadedFile::new("1.jpg", vec![])])
            .await
            .unwrap_err();
        assert!(matches!(err, RenameError::NoMappings));
    }

    #[tokio::test]
    async fn test_no_files() {
        let renamer = renamer_with(&[("1", "a")]);
        assert!(matches!(
            renamer.rename(vec![]).await,
            Err(RenameError::NoFiles)
        ));
    }

    #[tokio::test]
    async fn test_nothing_renamed_has_no_session() {
        let renamer = renamer_with(&[("1", "a")]);
        let report = renamer
            .rename(vec![UploadedFile::new("2.jpg", vec![])])
            .await
            .unwrap();
        assert!(!report.zip_ready);
        assert!(report.session_id.is_none());
    }

    #[tokio::test]
    async fn test_archive_consumes_session() {
        let renamer = renamer_with(&[("24369", "TAZZA")]);
        let report = renamer
            .rename(vec![
                UploadedFile::new("24369.jpg", b"first".to_vec()),
                UploadedFile::new("24369.JPG", b"second".to_vec()),
            ])
            .await
            .unwrap();
        let session_id = report.session_id.unwrap();

        let (name, bytes) = renamer.archive(&session_id).unwrap();
        assert_eq!(name, format!("foto_rinominate_{}.zip", &session_id[..8]));

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("TAZZA (2).jpg")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "second");

        assert!(matches!(
            renamer.archive(&session_id),
            Err(RenameError::SessionNotFound(_))
        ));
    }
}
