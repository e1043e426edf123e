//! Progress storage trait and the in-process implementation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::types::{ProgressError, ProgressState};

/// Keyed storage for progress records.
///
/// The orchestrator only needs get/put/delete plus a staleness scan, so the
/// backing store can be swapped without touching task logic.
pub trait ProgressStore: Send + Sync {
    fn get(&self, task_id: &str) -> Result<Option<ProgressState>, ProgressError>;

    fn put(&self, state: ProgressState) -> Result<(), ProgressError>;

    fn delete(&self, task_id: &str) -> Result<bool, ProgressError>;

    /// Ids of terminal tasks finished at least `retention` before `now`.
    fn list_stale(
        &self,
        now: DateTime<Utc>,
        retention: chrono::Duration,
    ) -> Result<Vec<String>, ProgressError>;

    /// All records, oldest first.
    fn list(&self) -> Result<Vec<ProgressState>, ProgressError>;
}

/// Process-local store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    tasks: RwLock<HashMap<String, ProgressState>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ProgressError {
    ProgressError::Storage("progress lock poisoned".to_string())
}

impl ProgressStore for InMemoryProgressStore {
    fn get(&self, task_id: &str) -> Result<Option<ProgressState>, ProgressError> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks.get(task_id).cloned())
    }

    fn put(&self, state: ProgressState) -> Result<(), ProgressError> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        tasks.insert(state.task_id.clone(), state);
        Ok(())
    }

    fn delete(&self, task_id: &str) -> Result<bool, ProgressError> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        Ok(tasks.remove(task_id).is_some())
    }

    fn list_stale(
        &self,
        now: DateTime<Utc>,
        retention: chrono::Duration,
    ) -> Result<Vec<String>, ProgressError> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks
            .values()
            .filter(|state| state.is_stale(now, retention))
            .map(|state| state.task_id.clone())
            .collect())
    }

    fn list(&self) -> Result<Vec<ProgressState>, ProgressError> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        let mut all: Vec<_> = tasks.values().cloned().collect();
        all.sort_by_key(|state| state.start_time);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::TaskStatus;

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryProgressStore::new();
        store.put(ProgressState::new("a", 2)).unwrap();

        let state = store.get("a").unwrap().unwrap();
        assert_eq!(state.total_items, 2);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_list_stale_only_returns_old_terminal_tasks() {
        let store = InMemoryProgressStore::new();
        let now = Utc::now();
        let retention = chrono::Duration::seconds(600);

        let mut old_done = ProgressState::new("old", 1);
        old_done.status = TaskStatus::Completed;
        old_done.finished_at = Some(now - chrono::Duration::seconds(700));
        store.put(old_done).unwrap();

        let mut fresh_done = ProgressState::new("fresh", 1);
        fresh_done.status = TaskStatus::Error;
        fresh_done.finished_at = Some(now - chrono::Duration::seconds(10));
        store.put(fresh_done).unwrap();

        store.put(ProgressState::new("running", 5)).unwrap();

        assert_eq!(store.list_stale(now, retention).unwrap(), vec!["old"]);
        assert_eq!(store.list().unwrap().len(), 3);
    }
}
