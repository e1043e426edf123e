//! Types for the image discovery engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error message attached to every not-found result.
pub const NOT_FOUND_MESSAGE: &str = "Immagine non trovata";

/// Error message for a blank code inside a batch.
pub const EMPTY_CODE_MESSAGE: &str = "Codice prodotto non può essere vuoto";

/// A trimmed, non-empty product code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductCode(String);

impl ProductCode {
    /// Trim the raw input and reject it if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, DiscoveryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DiscoveryError::EmptyCode);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, when the code is made of ASCII digits only.
    pub fn numeric_value(&self) -> Option<u64> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }

    /// Width to zero-pad neighbours to, if the code has leading zeros.
    pub(crate) fn zero_pad_width(&self) -> Option<usize> {
        (self.0.len() > 1 && self.0.starts_with('0')).then_some(self.0.len())
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which naming rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateTier {
    Exact,
    NumberedVariant,
    Literal,
    Adjacency,
}

impl CandidateTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateTier::Exact => "exact",
            CandidateTier::NumberedVariant => "numbered_variant",
            CandidateTier::Literal => "literal",
            CandidateTier::Adjacency => "adjacency",
        }
    }
}

/// A guessed remote filename (not yet percent-encoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePattern {
    pub filename: String,
    pub tier: CandidateTier,
}

/// Outcome of searching one code.
///
/// `found == true` always carries `image_url` and `format`; `found == false`
/// always carries `error`. Use [`SearchResult::found`] and
/// [`SearchResult::not_found`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub code: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    pub fn found(
        code: impl Into<String>,
        image_url: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            found: true,
            image_url: Some(image_url.into()),
            format: Some(format.into()),
            error: None,
        }
    }

    pub fn not_found(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            found: false,
            image_url: None,
            format: None,
            error: Some(error.into()),
        }
    }

    /// Archive entry name for a found image: `{code}{format}`.
    pub fn download_name(&self) -> Option<String> {
        self.format
            .as_deref()
            .map(|format| format!("{}{}", self.code, format))
    }
}

/// A search result together with the number of probes it cost.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: SearchResult,
    pub probes_used: u32,
}

/// Errors raised before discovery starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Codice prodotto non può essere vuoto")]
    EmptyCode,
}
