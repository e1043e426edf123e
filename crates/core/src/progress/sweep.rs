//! Eviction of finished tasks.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ProgressConfig;

use super::store::ProgressStore;
use super::types::ProgressError;

/// Delete terminal tasks older than `retention`. Returns how many went.
pub fn sweep_stale(
    store: &dyn ProgressStore,
    retention: Duration,
) -> Result<usize, ProgressError> {
    let retention = chrono::Duration::from_std(retention)
        .map_err(|e| ProgressError::Storage(format!("invalid retention: {}", e)))?;

    let stale = store.list_stale(Utc::now(), retention)?;
    let mut removed = 0;
    for task_id in stale {
        if store.delete(&task_id)? {
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(removed, "Evicted finished progress records");
    }
    Ok(removed)
}

/// Run [`sweep_stale`] every `sweep_interval_secs` until the runtime stops.
pub fn spawn_sweeper(store: Arc<dyn ProgressStore>, config: &ProgressConfig) -> JoinHandle<()> {
    let retention = Duration::from_secs(config.retention_secs);
    let interval = Duration::from_secs(config.sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_stale(store.as_ref(), retention) {
                warn!(error = %e, "Progress sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{InMemoryProgressStore, ProgressState, TaskStatus};

    fn finished(id: &str, secs_ago: i64) -> ProgressState {
        let mut state = ProgressState::new(id, 0);
        state.status = TaskStatus::Completed;
        state.finished_at = Some(Utc::now() - chrono::Duration::seconds(secs_ago));
        state
    }

    #[test]
    fn test_sweep_removes_only_stale() {
        let store = InMemoryProgressStore::new();
        store.put(finished("old", 900)).unwrap();
        store.put(finished("new", 5)).unwrap();
        store.put(ProgressState::new("running", 3)).unwrap();

        let removed = sweep_stale(&store, Duration::from_secs(600)).unwrap();

        assert_eq!(removed, 1);
        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("new").unwrap().is_some());
        assert!(store.get("running").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let store: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::new());
        store.put(finished("old", 5)).unwrap();

        let config = ProgressConfig {
            retention_secs: 0,
            sweep_interval_secs: 1,
        };
        let handle = spawn_sweeper(store.clone(), &config);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        assert!(store.get("old").unwrap().is_none());
    }
}
