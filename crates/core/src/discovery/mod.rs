//! Pattern-based remote image discovery.
//!
//! [`PatternGenerator`] turns a code into candidate filenames,
//! [`DiscoveryEngine`] probes them against the origin under a fixed budget.

mod config;
mod engine;
mod patterns;
mod types;

pub use config::{DiscoveryConfig, PatternRules, RangeTemplate, DEFAULT_EXTENSIONS};
pub use engine::DiscoveryEngine;
pub use patterns::PatternGenerator;
pub use types::*;
