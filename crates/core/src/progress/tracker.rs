//! Writer handle for a single task's progress.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::discovery::SearchResult;

use super::store::ProgressStore;
use super::types::{ProgressError, ProgressSnapshot, ProgressState, TaskStatus};

/// The only writer of a task's [`ProgressState`].
///
/// Every mutation re-reads the record, checks the transition is legal and
/// writes it back. Pollers read through [`ProgressStore::get`] and never
/// see a partially applied update.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    task_id: String,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("task_id", &self.task_id)
            .finish()
    }
}

impl ProgressTracker {
    /// Create a fresh `in_progress` record with a random task id.
    pub fn start(store: Arc<dyn ProgressStore>, total_items: usize) -> Result<Self, ProgressError> {
        let task_id = Uuid::new_v4().to_string();
        store.put(ProgressState::new(task_id.clone(), total_items))?;
        debug!(task_id = %task_id, total_items, "Progress tracking started");
        Ok(Self { store, task_id })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn snapshot(&self) -> Result<ProgressSnapshot, ProgressError> {
        Ok(self.load()?.into())
    }

    /// Mark `code` as the item currently being processed.
    pub fn begin_item(&self, code: &str) -> Result<(), ProgressError> {
        self.update(|state| {
            state.current_item = code.to_string();
            Ok(())
        })
    }

    /// Record one processed item.
    pub fn record(&self, result: &SearchResult) -> Result<(), ProgressError> {
        self.update(|state| {
            if state.completed_items >= state.total_items {
                return Err(ProgressError::Overflow {
                    task_id: state.task_id.clone(),
                    total: state.total_items,
                });
            }
            state.completed_items += 1;
            if result.found {
                state.found_items.push(result.code.clone());
            } else {
                state.not_found_items.push(result.code.clone());
            }
            state.results.push(result.clone());
            Ok(())
        })
    }

    /// Transition to `completed`. Every item must have been recorded.
    pub fn complete(&self) -> Result<(), ProgressError> {
        self.update(|state| {
            if state.completed_items != state.total_items {
                return Err(ProgressError::Incomplete {
                    task_id: state.task_id.clone(),
                    completed: state.completed_items,
                    total: state.total_items,
                });
            }
            state.status = TaskStatus::Completed;
            state.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Transition to `error`, keeping whatever was recorded so far.
    pub fn fail(&self, message: &str) -> Result<(), ProgressError> {
        self.update(|state| {
            state.status = TaskStatus::Error;
            state.current_item = message.to_string();
            state.error = Some(message.to_string());
            state.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    fn load(&self) -> Result<ProgressState, ProgressError> {
        self.store
            .get(&self.task_id)?
            .ok_or_else(|| ProgressError::NotFound(self.task_id.clone()))
    }

    fn update<F>(&self, apply: F) -> Result<(), ProgressError>
    where
        F: FnOnce(&mut ProgressState) -> Result<(), ProgressError>,
    {
        let mut state = self.load()?;
        if state.status.is_terminal() {
            return Err(ProgressError::AlreadyFinished {
                task_id: state.task_id,
                status: state.status.as_str().to_string(),
            });
        }
        apply(&mut state)?;
        self.store.put(state)
    }
}

/// Look up a task for a poller.
pub fn get_snapshot(
    store: &dyn ProgressStore,
    task_id: &str,
) -> Result<ProgressSnapshot, ProgressError> {
    store
        .get(task_id)?
        .map(ProgressSnapshot::from)
        .ok_or_else(|| ProgressError::NotFound(task_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::NOT_FOUND_MESSAGE;
    use crate::progress::InMemoryProgressStore;

    fn tracker(total: usize) -> (Arc<InMemoryProgressStore>, ProgressTracker) {
        let store = Arc::new(InMemoryProgressStore::new());
        let tracker = ProgressTracker::start(store.clone(), total).unwrap();
        (store, tracker)
    }

    fn found(code: &str) -> SearchResult {
        SearchResult::found(code, format!("https://o/{}.jpg", code), ".jpg")
    }

    #[test]
    fn test_happy_path() {
        let (store, tracker) = tracker(2);

        tracker.begin_item("1").unwrap();
        tracker.record(&found("1")).unwrap();
        tracker.begin_item("2").unwrap();
        tracker
            .record(&SearchResult::not_found("2", NOT_FOUND_MESSAGE))
            .unwrap();
        tracker.complete().unwrap();

        let snapshot = get_snapshot(store.as_ref(), tracker.task_id()).unwrap();
        assert_eq!(snapshot.state.status, TaskStatus::Completed);
        assert_eq!(snapshot.state.found_items, vec!["1"]);
        assert_eq!(snapshot.state.not_found_items, vec!["2"]);
        assert_eq!(snapshot.progress_percentage, 100);
        assert!(snapshot.state.finished_at.is_some());
    }

    #[test]
    fn test_cannot_complete_early() {
        let (_, tracker) = tracker(2);
        tracker.record(&found("1")).unwrap();

        let err = tracker.complete().unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Incomplete {
                completed: 1,
                total: 2,
                ..
            }
        ));
        assert_eq!(
            tracker.snapshot().unwrap().state.status,
            TaskStatus::InProgress
        );
    }

    #[test]
    fn test_completed_items_never_exceed_total() {
        let (_, tracker) = tracker(1);
        tracker.record(&found("1")).unwrap();

        let err = tracker.record(&found("2")).unwrap_err();
        assert!(matches!(err, ProgressError::Overflow { total: 1, .. }));
        assert_eq!(tracker.snapshot().unwrap().state.completed_items, 1);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let (_, tracker) = tracker(3);
        tracker.record(&found("1")).unwrap();
        tracker.fail("boom").unwrap();

        assert!(matches!(
            tracker.record(&found("2")),
            Err(ProgressError::AlreadyFinished { .. })
        ));
        assert!(matches!(
            tracker.complete(),
            Err(ProgressError::AlreadyFinished { .. })
        ));
        assert!(matches!(
            tracker.fail("again"),
            Err(ProgressError::AlreadyFinished { .. })
        ));

        let state = tracker.snapshot().unwrap().state;
        assert_eq!(state.status, TaskStatus::Error);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.current_item, "boom");
        assert_eq!(state.completed_items, 1);
    }

    #[test]
    fn test_empty_task_can_complete_immediately() {
        let (_, tracker) = tracker(0);
        tracker.complete().unwrap();
        assert_eq!(
            tracker.snapshot().unwrap().state.status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_unknown_task() {
        let store = InMemoryProgressStore::new();
        assert_eq!(
            get_snapshot(&store, "nope").unwrap_err(),
            ProgressError::NotFound("nope".to_string())
        );
    }
}
