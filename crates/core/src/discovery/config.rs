//! Discovery engine and naming-convention configuration.

use serde::{Deserialize, Serialize};

/// Extensions tried for every code, in priority order.
pub const DEFAULT_EXTENSIONS: [&str; 10] = [
    ".jpg", ".JPG", ".png", ".PNG", ".jpeg", ".JPEG", ".webp", ".WEBP", ".tif", ".TIF",
];

/// Configuration for the discovery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum probes issued for a single code, across all extensions.
    #[serde(default = "default_probe_budget")]
    pub probe_budget: u32,

    /// Extensions tried in order. Case variants are listed explicitly
    /// because the remote corpus is case-sensitive.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_probe_budget() -> u32 {
    40
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_budget: default_probe_budget(),
            extensions: default_extensions(),
        }
    }
}

/// Naming conventions observed in the remote corpus.
///
/// Only the numbered-variant and numeric-adjacency rules are generic; every
/// literal exception lives in `literal_templates` and `range_templates` so it
/// can be edited without touching code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRules {
    /// How many `{code} (n)` variants to try.
    #[serde(default = "default_numbered_variants")]
    pub numbered_variants: u32,

    /// Literal templates with a `{code}` placeholder, extension appended.
    #[serde(default = "default_literal_templates")]
    pub literal_templates: Vec<String>,

    /// Cap on adjacency candidates contributed per extension.
    #[serde(default = "default_max_adjacency")]
    pub max_adjacency_candidates: usize,

    /// Numeric code ranges photographed together under a product name.
    #[serde(default = "default_range_templates")]
    pub range_templates: Vec<RangeTemplate>,
}

/// A code range stored remotely as `"{from} - ... - {to} {suffix}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTemplate {
    pub from: u64,
    pub to: u64,
    pub suffix: String,
}

impl RangeTemplate {
    pub fn contains(&self, value: u64) -> bool {
        self.from <= value && value <= self.to
    }
}

fn default_numbered_variants() -> u32 {
    4
}

fn default_literal_templates() -> Vec<String> {
    [
        "{code} - BEST TISANIERA",
        "{code} - ROSSO",
        "{code}- VEGA SET 6 COPPETTE ARLECCHIN",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_max_adjacency() -> usize {
    8
}

fn default_range_templates() -> Vec<RangeTemplate> {
    vec![RangeTemplate {
        from: 22492,
        to: 22496,
        suffix: "PORTAFOTO-ALTEA".to_string(),
    }]
}

impl Default for PatternRules {
    fn default() -> Self {
        Self {
            numbered_variants: default_numbered_variants(),
            literal_templates: default_literal_templates(),
            max_adjacency_candidates: default_max_adjacency(),
            range_templates: default_range_templates(),
        }
    }
}
