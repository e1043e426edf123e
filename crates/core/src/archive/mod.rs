//! In-memory ZIP assembly.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::discovery::SearchResult;
use crate::origin::Fetcher;

/// Download name for the batch image archive.
pub const BATCH_ARCHIVE_NAME: &str = "immagini_prodotti.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nessuna immagine trovata per i codici forniti")]
    NothingFetched,
}

/// Builds a deflated ZIP in memory, keeping entry names unique.
pub struct ZipBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
    entries: usize,
}

impl Default for ZipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            names: HashSet::new(),
            entries: 0,
        }
    }

    /// Add an entry; returns the name actually used.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<String, ArchiveError> {
        let name = self.unique_name(name);
        self.writer.start_file(name.as_str(), self.options)?;
        self.writer.write_all(bytes)?;
        self.entries += 1;
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        Ok(self.writer.finish()?.into_inner())
    }

    /// `a.jpg`, then `a (2).jpg`, `a (3).jpg`, ...
    fn unique_name(&mut self, name: &str) -> String {
        if self.names.insert(name.to_string()) {
            return name.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = numbered(name, n);
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn numbered(name: &str, n: u32) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({}){}", &name[..dot], n, &name[dot..]),
        _ => format!("{} ({})", name, n),
    }
}

/// Download every found image and pack it as `{code}{format}`.
///
/// Fetch failures are logged and skipped. Fails with
/// [`ArchiveError::NothingFetched`] when no image could be downloaded.
pub async fn archive_found_images(
    fetcher: &dyn Fetcher,
    results: &[SearchResult],
) -> Result<Vec<u8>, ArchiveError> {
    let mut zip = ZipBuilder::new();

    for result in results.iter().filter(|r| r.found) {
        let (Some(url), Some(name)) = (result.image_url.as_deref(), result.download_name()) else {
            continue;
        };
        match fetcher.fetch(url).await {
            Ok(bytes) => {
                let entry = zip.add(&name, &bytes)?;
                debug!(code = %result.code, entry = %entry, bytes = bytes.len(), "Added image to archive");
            }
            Err(e) => {
                warn!(code = %result.code, url = %url, error = %e, "Skipping image that could not be downloaded");
            }
        }
    }

    if zip.is_empty() {
        return Err(ArchiveError::NothingFetched);
    }
    zip.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOrigin;
    use std::io::Read;

    fn entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_duplicate_names_are_numbered() {
        let mut zip = ZipBuilder::new();
        assert_eq!(zip.add("24369.jpg", b"a").unwrap(), "24369.jpg");
        assert_eq!(zip.add("24369.jpg", b"b").unwrap(), "24369 (2).jpg");
        assert_eq!(zip.add("24369.jpg", b"c").unwrap(), "24369 (3).jpg");
        assert_eq!(zip.add("noext", b"d").unwrap(), "noext");
        assert_eq!(zip.add("noext", b"e").unwrap(), "noext (2)");
        assert_eq!(zip.len(), 5);

        let names: Vec<_> = entries(zip.finish().unwrap())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_numbered_name_does_not_collide_with_literal() {
        let mut zip = ZipBuilder::new();
        zip.add("a (2).jpg", b"x").unwrap();
        zip.add("a.jpg", b"y").unwrap();
        assert_eq!(zip.add("a.jpg", b"z").unwrap(), "a (3).jpg");
    }

    #[tokio::test]
    async fn test_archive_skips_failed_fetches() {
        let origin = MockOrigin::new("https://o.test/img");
        origin.add_file_with_body("1.jpg", b"one".to_vec()).await;
        origin.add_file("2.png").await;
        origin.fail_fetch("2.png").await;

        let results = vec![
            SearchResult::found("1", "https://o.test/img/1.jpg", ".jpg"),
            SearchResult::found("2", "https://o.test/img/2.png", ".png"),
            SearchResult::not_found("3", "Immagine non trovata"),
        ];

        let bytes = archive_found_images(&origin, &results).await.unwrap();
        let files = entries(bytes);

        assert_eq!(files, vec![("1.jpg".to_string(), b"one".to_vec())]);
    }

    #[tokio::test]
    async fn test_archive_with_nothing_fetched() {
        let origin = MockOrigin::new("https://o.test/img");
        let results = vec![SearchResult::found("9", "https://o.test/img/9.jpg", ".jpg")];

        let err = archive_found_images(&origin, &results).await.unwrap_err();
        assert!(matches!(err, ArchiveError::NothingFetched));
    }
}
