//! Keeps the mapping table in sync with the remote spreadsheet.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics::MAPPING_REFRESHES;
use crate::origin::Fetcher;
use crate::spreadsheet;

use super::store::{MappingStore, META_FILE_HASH, META_LAST_UPDATED};
use super::types::{MappingError, MappingListing, RefreshReport};

/// Fetches the mapping spreadsheet and reloads the table when its md5 changes.
#[derive(Clone)]
pub struct MappingRefresher {
    store: Arc<dyn MappingStore>,
    fetcher: Arc<dyn Fetcher>,
    url: Option<String>,
}

impl MappingRefresher {
    pub fn new(store: Arc<dyn MappingStore>, fetcher: Arc<dyn Fetcher>, url: Option<String>) -> Self {
        Self {
            store,
            fetcher,
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Check the spreadsheet and reload the table if it changed.
    /// `force` forgets the stored hash first, so the table is always reloaded.
    pub async fn refresh(&self, force: bool) -> Result<RefreshReport, MappingError> {
        let result = self.refresh_inner(force).await;
        let label = match &result {
            Ok(report) if report.updated => "updated",
            Ok(_) => "unchanged",
            Err(_) => "failed",
        };
        MAPPING_REFRESHES.with_label_values(&[label]).inc();
        result
    }

    async fn refresh_inner(&self, force: bool) -> Result<RefreshReport, MappingError> {
        let url = self.url.as_deref().ok_or(MappingError::NotConfigured)?;

        if force {
            self.store.delete_meta(META_FILE_HASH)?;
        }

        let body = self.fetcher.fetch(url).await?;
        let hash = format!("{:x}", md5::compute(&body));

        if self.store.meta(META_FILE_HASH)?.as_deref() == Some(hash.as_str()) {
            let total = self.store.count()?;
            info!(total, "Mapping spreadsheet unchanged");
            return Ok(RefreshReport {
                updated: false,
                total,
                delta: 0,
                message: "File Excel non modificato".to_string(),
            });
        }

        let mappings = spreadsheet::read_mappings(&spreadsheet_name(url), &body)?;
        let previous = self.store.count()?;
        let total = self.store.replace_all(&mappings)?;
        self.store.set_meta(META_FILE_HASH, &hash)?;
        self.store
            .set_meta(META_LAST_UPDATED, &Utc::now().to_rfc3339())?;

        let delta = total as i64 - previous as i64;
        info!(total, delta, hash = %hash, "Mapping table reloaded");
        Ok(RefreshReport {
            updated: true,
            total,
            delta,
            message: format!(
                "File Excel aggiornato! {} mappature ({:+} rispetto a prima)",
                total, delta
            ),
        })
    }

    /// Load the table on first use. Returns the mapping count.
    ///
    /// Fetch failures are logged and leave the table as it is.
    pub async fn ensure_loaded(&self) -> Result<usize, MappingError> {
        let count = self.store.count()?;
        if count > 0 || !self.is_configured() {
            return Ok(count);
        }
        match self.refresh(true).await {
            Ok(report) => Ok(report.total),
            Err(e) => {
                warn!(error = %e, "Could not load mapping spreadsheet");
                self.store.count()
            }
        }
    }

    /// Current table and refresh metadata.
    pub fn listing(&self) -> Result<MappingListing, MappingError> {
        let mappings = self.store.list()?;
        Ok(MappingListing {
            total: mappings.len(),
            mappings,
            last_updated: self.store.meta(META_LAST_UPDATED)?,
            file_hash: self.store.meta(META_FILE_HASH)?,
        })
    }
}

/// Name used to pick the parser: the URL's last path segment when it has a
/// spreadsheet extension, else `.xlsx`.
fn spreadsheet_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    if spreadsheet::is_supported(last) {
        last.to_string()
    } else {
        "mapping.xlsx".to_string()
    }
}
