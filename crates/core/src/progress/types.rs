//! Progress state for tracked batch tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::SearchResult;

/// Lifecycle of a tracked task. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

/// Mutable progress record for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub task_id: String,
    pub total_items: usize,
    pub completed_items: usize,
    /// Code being searched; the failure message once the task errors.
    pub current_item: String,
    /// Codes found so far, in processing order.
    pub found_items: Vec<String>,
    /// Codes not found so far, in processing order.
    pub not_found_items: Vec<String>,
    /// Per-code results, in processing order.
    pub results: Vec<SearchResult>,
    pub status: TaskStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressState {
    pub fn new(task_id: impl Into<String>, total_items: usize) -> Self {
        Self {
            task_id: task_id.into(),
            total_items,
            completed_items: 0,
            current_item: String::new(),
            found_items: Vec::new(),
            not_found_items: Vec::new(),
            results: Vec::new(),
            status: TaskStatus::InProgress,
            start_time: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    /// Whole-number percentage, 100 for an empty task.
    pub fn progress_percentage(&self) -> u8 {
        if self.total_items == 0 {
            return 100;
        }
        ((self.completed_items * 100) / self.total_items) as u8
    }

    /// Whether the task has been terminal for longer than `retention`.
    pub fn is_stale(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        match (self.status.is_terminal(), self.finished_at) {
            (true, Some(finished)) => now - finished >= retention,
            _ => false,
        }
    }
}

/// Read-only view handed to pollers, with derived counters flattened in.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    #[serde(flatten)]
    pub state: ProgressState,
    pub progress_percentage: u8,
    pub found_count: usize,
    pub not_found_count: usize,
}

impl From<ProgressState> for ProgressSnapshot {
    fn from(state: ProgressState) -> Self {
        Self {
            progress_percentage: state.progress_percentage(),
            found_count: state.found_items.len(),
            not_found_count: state.not_found_items.len(),
            state,
        }
    }
}

/// Errors from progress operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {task_id} already finished with status {status}")]
    AlreadyFinished { task_id: String, status: String },

    #[error("Task {task_id} cannot complete: {completed} of {total} items processed")]
    Incomplete {
        task_id: String,
        completed: usize,
        total: usize,
    },

    #[error("Task {task_id} already processed all {total} items")]
    Overflow { task_id: String, total: usize },

    #[error("Progress storage error: {0}")]
    Storage(String),
}
