//! Candidate filename generation.
//!
//! Turns a product code and an extension into an ordered list of filenames
//! the remote corpus is known to use, most likely first:
//!
//! 1. exact match `{code}{ext}`
//! 2. numbered variants `{code} (n){ext}`
//! 3. literal templates from [`PatternRules::literal_templates`]
//! 4. numeric adjacency: the code inside a ` - `-joined run of consecutive
//!    codes, e.g. `22492 - 22493 - 22494 - 22495 - 22496 PORTAFOTO-ALTEA.jpg`
//!
//! Generation is pure: no I/O and the same input always yields the same list.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use super::config::PatternRules;
use super::types::{CandidatePattern, CandidateTier, ProductCode};

/// Separator between codes in multi-product filenames.
const ADJACENCY_SEPARATOR: &str = " - ";

/// Smallest and largest run of consecutive codes tried.
const MIN_WINDOW: u64 = 2;
const MAX_WINDOW: u64 = 5;

/// Generates candidate filenames from configured naming rules.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    rules: PatternRules,
}

impl PatternGenerator {
    pub fn new(rules: PatternRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PatternRules {
        &self.rules
    }

    /// Ordered candidates for one code and one extension.
    pub fn candidates(&self, code: &ProductCode, extension: &str) -> Vec<CandidatePattern> {
        let code_str = code.as_str();
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        let mut push = |stem: String, tier: CandidateTier| {
            let filename = format!("{}{}", stem, extension);
            if seen.insert(filename.clone()) {
                out.push(CandidatePattern { filename, tier });
            }
        };

        push(code_str.to_string(), CandidateTier::Exact);

        for n in 1..=self.rules.numbered_variants {
            push(format!("{} ({})", code_str, n), CandidateTier::NumberedVariant);
        }

        for template in &self.rules.literal_templates {
            push(template.replace("{code}", code_str), CandidateTier::Literal);
        }

        if let Some(value) = code.numeric_value() {
            for stem in self.adjacency_stems(code, value) {
                push(stem, CandidateTier::Adjacency);
            }
        }

        out
    }

    /// Adjacency stems (no extension), capped at `max_adjacency_candidates`.
    ///
    /// Windows confined to a configured range come first, carrying that
    /// range's product-name suffix; bare windows follow.
    fn adjacency_stems(&self, code: &ProductCode, value: u64) -> Vec<String> {
        let cap = self.rules.max_adjacency_candidates;
        let mut stems = Vec::new();
        let mut seen = HashSet::new();

        for range in self.rules.range_templates.iter().filter(|r| r.contains(value)) {
            let suffix = range.suffix.trim();
            for window in adjacency_windows(value, Some((range.from, range.to))) {
                let joined = join_window(code, value, window);
                let stem = if suffix.is_empty() {
                    joined
                } else {
                    format!("{} {}", joined, suffix)
                };
                push_capped(&mut stems, &mut seen, cap, stem);
            }
        }

        for window in adjacency_windows(value, None) {
            push_capped(&mut stems, &mut seen, cap, join_window(code, value, window));
        }

        stems
    }
}

fn push_capped(stems: &mut Vec<String>, seen: &mut HashSet<String>, cap: usize, stem: String) {
    if stems.len() < cap && seen.insert(stem.clone()) {
        stems.push(stem);
    }
}

/// Runs of 2..=5 consecutive integers containing `value`.
///
/// Ordered by size, then by the code's position: leading, middle, trailing.
/// Runs that would go below zero or outside `bounds` are skipped.
fn adjacency_windows(value: u64, bounds: Option<(u64, u64)>) -> Vec<RangeInclusive<u64>> {
    let mut windows = Vec::new();
    for size in MIN_WINDOW..=MAX_WINDOW {
        for position in 0..size {
            let Some(start) = value.checked_sub(position) else {
                continue;
            };
            let Some(end) = start.checked_add(size - 1) else {
                continue;
            };
            if let Some((from, to)) = bounds {
                if start < from || end > to {
                    continue;
                }
            }
            windows.push(start..=end);
        }
    }
    windows
}

/// Render a run, keeping the caller's spelling for the code itself.
fn join_window(code: &ProductCode, value: u64, window: RangeInclusive<u64>) -> String {
    let pad = code.zero_pad_width();
    window
        .map(|n| {
            if n == value {
                code.as_str().to_string()
            } else {
                match pad {
                    Some(width) => format!("{:0width$}", n, width = width),
                    None => n.to_string(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(ADJACENCY_SEPARATOR)
}
