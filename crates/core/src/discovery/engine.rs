//! Bounded, sequential probing of candidate filenames.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::metrics::{PROBES_PER_SEARCH, SEARCHES_TOTAL};
use crate::origin::{build_url, Prober};

use super::patterns::PatternGenerator;
use super::types::{DiscoveryError, ProductCode, SearchOutcome, SearchResult, NOT_FOUND_MESSAGE};

/// Finds the remote image for a product code.
///
/// Extensions are walked in priority order and, within each, candidates in
/// generator order. The first positive probe wins. At most `probe_budget`
/// probes are issued per code.
#[derive(Clone)]
pub struct DiscoveryEngine {
    prober: Arc<dyn Prober>,
    generator: PatternGenerator,
    base_url: String,
    extensions: Vec<String>,
    probe_budget: u32,
}

impl DiscoveryEngine {
    pub fn new(
        prober: Arc<dyn Prober>,
        generator: PatternGenerator,
        base_url: impl Into<String>,
        extensions: Vec<String>,
        probe_budget: u32,
    ) -> Self {
        Self {
            prober,
            generator,
            base_url: base_url.into(),
            extensions,
            probe_budget,
        }
    }

    pub fn from_config(config: &Config, prober: Arc<dyn Prober>) -> Self {
        Self::new(
            prober,
            PatternGenerator::new(config.patterns.clone()),
            config.origin.base_url.clone(),
            config.discovery.extensions.clone(),
            config.discovery.probe_budget,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn probe_budget(&self) -> u32 {
        self.probe_budget
    }

    /// Full URL for a filename under the origin base path.
    pub fn image_url(&self, filename: &str) -> String {
        build_url(&self.base_url, filename)
    }

    /// Search one code. Never fails: exhaustion is a not-found result.
    pub async fn find(&self, code: &ProductCode) -> SearchOutcome {
        let mut probes_used = 0u32;

        'extensions: for extension in &self.extensions {
            for candidate in self.generator.candidates(code, extension) {
                if probes_used >= self.probe_budget {
                    debug!(code = %code, budget = self.probe_budget, "Probe budget exhausted");
                    break 'extensions;
                }

                let url = self.image_url(&candidate.filename);
                probes_used += 1;

                if self.prober.probe(&url).await {
                    info!(
                        code = %code,
                        filename = %candidate.filename,
                        tier = candidate.tier.as_str(),
                        probes = probes_used,
                        "Image found"
                    );
                    record(true, probes_used);
                    return SearchOutcome {
                        result: SearchResult::found(code.as_str(), url, extension.as_str()),
                        probes_used,
                    };
                }
            }
        }

        debug!(code = %code, probes = probes_used, "Image not found");
        record(false, probes_used);
        SearchOutcome {
            result: SearchResult::not_found(code.as_str(), NOT_FOUND_MESSAGE),
            probes_used,
        }
    }

    /// Trim and validate a raw code, then search it.
    pub async fn find_raw(&self, raw: &str) -> Result<SearchOutcome, DiscoveryError> {
        let code = ProductCode::parse(raw)?;
        Ok(self.find(&code).await)
    }
}

fn record(found: bool, probes: u32) {
    let label = if found { "found" } else { "not_found" };
    SEARCHES_TOTAL.with_label_values(&[label]).inc();
    PROBES_PER_SEARCH
        .with_label_values(&[label])
        .observe(f64::from(probes));
}
