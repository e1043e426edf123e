//! Batch result and error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::SearchResult;
use crate::progress::ProgressError;

/// Aggregated outcome of a batch search.
///
/// Every input code appears exactly once in either `found_codes` or
/// `not_found_codes`, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_codes: usize,
    pub found_codes: Vec<String>,
    pub not_found_codes: Vec<String>,
    pub results: Vec<SearchResult>,
}

impl BatchResult {
    pub fn from_results(results: Vec<SearchResult>) -> Self {
        let (found, not_found): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.found);
        Self {
            total_codes: results.len(),
            found_codes: found.into_iter().map(|r| r.code.clone()).collect(),
            not_found_codes: not_found.into_iter().map(|r| r.code.clone()).collect(),
            results,
        }
    }

    /// Found results, in input order.
    pub fn found(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter().filter(|r| r.found)
    }
}

/// Response to starting a tracked batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStarted {
    pub task_id: String,
    pub total_items: usize,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Nessun codice prodotto da cercare")]
    Empty,

    #[error("Troppi codici prodotto: {count} (massimo {max})")]
    TooLarge { count: usize, max: usize },

    #[error(transparent)]
    Progress(#[from] ProgressError),
}
