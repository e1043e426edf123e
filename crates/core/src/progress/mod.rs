//! Progress tracking for background batch tasks.
//!
//! A task owns a [`ProgressTracker`] and is the only writer of its record.
//! Pollers read snapshots through the shared [`ProgressStore`]. Finished
//! records are evicted after a retention window by [`spawn_sweeper`].

mod store;
mod sweep;
mod tracker;
mod types;

pub use store::{InMemoryProgressStore, ProgressStore};
pub use sweep::{spawn_sweeper, sweep_stale};
pub use tracker::{get_snapshot, ProgressTracker};
pub use types::*;
