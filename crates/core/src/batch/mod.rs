//! Batch search over many product codes.

mod orchestrator;
mod types;

pub use orchestrator::BatchOrchestrator;
pub use types::*;
