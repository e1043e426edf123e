//! Fan-out of the discovery engine over many codes.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{BatchConfig, ProgressConfig};
use crate::discovery::{DiscoveryEngine, ProductCode, SearchResult, EMPTY_CODE_MESSAGE};
use crate::metrics::BATCH_TASKS;
use crate::progress::{sweep_stale, ProgressStore, ProgressTracker};

use super::types::{BatchError, BatchResult, TaskStarted};

/// Message stored on a tracked task whose worker panicked.
const TASK_PANIC_MESSAGE: &str = "Errore interno durante l'elaborazione";

/// Runs batches in one of three modes:
///
/// - [`run_concurrent`](Self::run_concurrent): bounded fan-out, returns when
///   every code is done.
/// - [`spawn_tracked`](Self::spawn_tracked): background, one code at a time,
///   progress written after each code.
/// - [`run_sequential`](Self::run_sequential): in the caller, one code at a
///   time with the politeness delay.
#[derive(Clone)]
pub struct BatchOrchestrator {
    engine: DiscoveryEngine,
    progress: Arc<dyn ProgressStore>,
    config: BatchConfig,
    retention: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        engine: DiscoveryEngine,
        progress: Arc<dyn ProgressStore>,
        config: BatchConfig,
        progress_config: &ProgressConfig,
    ) -> Self {
        Self {
            engine,
            progress,
            config,
            retention: Duration::from_secs(progress_config.retention_secs),
        }
    }

    pub fn engine(&self) -> &DiscoveryEngine {
        &self.engine
    }

    pub fn progress_store(&self) -> &Arc<dyn ProgressStore> {
        &self.progress
    }

    /// Reject empty and oversized batches before any probing.
    pub fn validate(&self, codes: &[String]) -> Result<(), BatchError> {
        if codes.is_empty() {
            return Err(BatchError::Empty);
        }
        if codes.len() > self.config.max_codes {
            return Err(BatchError::TooLarge {
                count: codes.len(),
                max: self.config.max_codes,
            });
        }
        Ok(())
    }

    /// Search every code with at most `max_concurrency` in flight.
    /// Results keep input order.
    pub async fn run_concurrent(&self, codes: Vec<String>) -> Result<BatchResult, BatchError> {
        self.validate(&codes)?;
        info!(codes = codes.len(), "Starting concurrent batch");

        let concurrency = self.config.max_concurrency.max(1);
        let results: Vec<SearchResult> = stream::iter(codes)
            .map(|code| {
                let orchestrator = self.clone();
                async move { orchestrator.search_code(&code).await }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let batch = BatchResult::from_results(results);
        BATCH_TASKS
            .with_label_values(&["concurrent", "completed"])
            .inc();
        info!(
            total = batch.total_codes,
            found = batch.found_codes.len(),
            "Concurrent batch finished"
        );
        Ok(batch)
    }

    /// Search codes one by one in the caller, pausing between codes.
    pub async fn run_sequential(&self, codes: Vec<String>) -> Result<BatchResult, BatchError> {
        self.validate(&codes)?;
        info!(codes = codes.len(), "Starting sequential batch");

        let mut results = Vec::with_capacity(codes.len());
        for (index, code) in codes.iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }
            results.push(self.search_code(code).await);
        }

        Ok(BatchResult::from_results(results))
    }

    /// Start a background batch and return its task id immediately.
    ///
    /// The worker runs under a supervisor that awaits its `JoinHandle`, so an
    /// error or a panic inside the loop always ends with the task in `error`.
    pub fn spawn_tracked(&self, codes: Vec<String>) -> Result<TaskStarted, BatchError> {
        self.validate(&codes)?;

        if let Err(e) = sweep_stale(self.progress.as_ref(), self.retention) {
            warn!(error = %e, "Progress sweep before task start failed");
        }

        let tracker = ProgressTracker::start(Arc::clone(&self.progress), codes.len())?;
        let started = TaskStarted {
            task_id: tracker.task_id().to_string(),
            total_items: codes.len(),
        };
        info!(task_id = %started.task_id, codes = codes.len(), "Tracked batch started");

        let worker = {
            let orchestrator = self.clone();
            let tracker = tracker.clone();
            tokio::spawn(async move { orchestrator.run_tracked(&tracker, codes).await })
        };

        tokio::spawn(async move {
            let message = match worker.await {
                Ok(Ok(())) => {
                    BATCH_TASKS.with_label_values(&["tracked", "completed"]).inc();
                    info!(task_id = %tracker.task_id(), "Tracked batch completed");
                    return;
                }
                Ok(Err(e)) => format!("Errore durante l'elaborazione: {}", e),
                Err(join_error) if join_error.is_panic() => TASK_PANIC_MESSAGE.to_string(),
                Err(join_error) => format!("Elaborazione interrotta: {}", join_error),
            };

            BATCH_TASKS.with_label_values(&["tracked", "error"]).inc();
            error!(task_id = %tracker.task_id(), error = %message, "Tracked batch failed");
            if let Err(e) = tracker.fail(&message) {
                warn!(task_id = %tracker.task_id(), error = %e, "Could not mark task as failed");
            }
        });

        Ok(started)
    }

    async fn run_tracked(
        &self,
        tracker: &ProgressTracker,
        codes: Vec<String>,
    ) -> Result<(), BatchError> {
        for (index, code) in codes.iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }
            tracker.begin_item(code.trim())?;
            let result = self.search_code(code).await;
            tracker.record(&result)?;
        }
        tracker.complete()?;
        Ok(())
    }

    /// Search one batch entry. Blank entries become not-found without probing.
    pub async fn search_code(&self, raw: &str) -> SearchResult {
        match ProductCode::parse(raw) {
            Ok(code) => self.engine.find(&code).await.result,
            Err(_) => SearchResult::not_found(raw.trim(), EMPTY_CODE_MESSAGE),
        }
    }

    async fn pause(&self) {
        if self.config.inter_request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.inter_request_delay_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::progress::{get_snapshot, InMemoryProgressStore, ProgressSnapshot, TaskStatus};
    use crate::testing::MockOrigin;

    const BASE: &str = "https://origin.test/img";

    fn setup(max_codes: usize) -> (Arc<MockOrigin>, BatchOrchestrator) {
        let origin = Arc::new(MockOrigin::new(BASE));
        let mut config = Config::default();
        config.origin.base_url = BASE.to_string();
        config.discovery.probe_budget = 10;
        config.batch.max_codes = max_codes;
        config.batch.inter_request_delay_ms = 0;

        let engine = DiscoveryEngine::from_config(&config, origin.clone());
        let orchestrator = BatchOrchestrator::new(
            engine,
            Arc::new(InMemoryProgressStore::new()),
            config.batch.clone(),
            &config.progress,
        );
        (origin, orchestrator)
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    async fn wait_terminal(orchestrator: &BatchOrchestrator, task_id: &str) -> ProgressSnapshot {
        for _ in 0..200 {
            let snapshot = get_snapshot(orchestrator.progress_store().as_ref(), task_id).unwrap();
            if snapshot.state.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never finished", task_id);
    }

    #[tokio::test]
    async fn test_concurrent_three_codes_two_found() {
        let (origin, orchestrator) = setup(100);
        origin.add_file("24369.jpg").await;
        origin.add_file("TEST1 (1).jpg").await;

        let batch = orchestrator
            .run_concurrent(codes(&["24369", "MISSING", "TEST1"]))
            .await
            .unwrap();

        assert_eq!(batch.total_codes, 3);
        assert_eq!(batch.found_codes, vec!["24369", "TEST1"]);
        assert_eq!(batch.not_found_codes, vec!["MISSING"]);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.results[1].code, "MISSING");
        let expected = orchestrator.engine().image_url("TEST1 (1).jpg");
        assert_eq!(batch.results[2].image_url.as_deref(), Some(expected.as_str()));
        // 24369 on the first probe, MISSING exhausts the budget, TEST1 on the second
        assert_eq!(origin.probe_count().await, 1 + 10 + 2);
    }

    #[tokio::test]
    async fn test_concurrent_batch_runs_on_spawned_task() {
        let (origin, orchestrator) = setup(100);
        origin.add_file("24369.jpg").await;

        let handle = tokio::spawn(async move {
            orchestrator
                .run_concurrent(codes(&["24369", "MISSING"]))
                .await
        });
        let batch = handle.await.unwrap().unwrap();

        assert_eq!(batch.found_codes, vec!["24369"]);
        assert_eq!(batch.not_found_codes, vec!["MISSING"]);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (origin, orchestrator) = setup(100);
        let err = orchestrator.run_concurrent(vec![]).await.unwrap_err();
        assert!(matches!(err, BatchError::Empty));
        assert_eq!(origin.probe_count().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_before_probing() {
        let (origin, orchestrator) = setup(2);
        let err = orchestrator
            .spawn_tracked(codes(&["1", "2", "3"]))
            .unwrap_err();
        assert!(matches!(err, BatchError::TooLarge { count: 3, max: 2 }));
        assert_eq!(origin.probe_count().await, 0);
    }

    #[tokio::test]
    async fn test_blank_entry_is_not_found_without_probes() {
        let (origin, orchestrator) = setup(100);

        let batch = orchestrator.run_sequential(codes(&["   "])).await.unwrap();

        assert_eq!(batch.not_found_codes, vec![""]);
        assert_eq!(
            batch.results[0].error.as_deref(),
            Some(EMPTY_CODE_MESSAGE)
        );
        assert_eq!(origin.probe_count().await, 0);
    }

    #[tokio::test]
    async fn test_tracked_batch_completes() {
        let (origin, orchestrator) = setup(100);
        origin.add_file("24369.jpg").await;

        let started = orchestrator
            .spawn_tracked(codes(&["24369", "NOPE", "24369"]))
            .unwrap();
        assert_eq!(started.total_items, 3);

        let snapshot = wait_terminal(&orchestrator, &started.task_id).await;

        assert_eq!(snapshot.state.status, TaskStatus::Completed);
        assert_eq!(snapshot.state.completed_items, 3);
        assert_eq!(snapshot.state.found_items, vec!["24369", "24369"]);
        assert_eq!(snapshot.state.not_found_items, vec!["NOPE"]);
        assert_eq!(snapshot.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_tracked_batch_panic_marks_error() {
        let (origin, orchestrator) = setup(100);
        origin.add_file("1.jpg").await;
        origin.panic_on("BOOM").await;

        let started = orchestrator
            .spawn_tracked(codes(&["1", "BOOM", "3"]))
            .unwrap();
        let snapshot = wait_terminal(&orchestrator, &started.task_id).await;

        assert_eq!(snapshot.state.status, TaskStatus::Error);
        assert_eq!(snapshot.state.error.as_deref(), Some(TASK_PANIC_MESSAGE));
        assert_eq!(snapshot.state.completed_items, 1);
        assert_eq!(snapshot.state.found_items, vec!["1"]);
    }

    #[tokio::test]
    async fn test_tracked_progress_is_observable_mid_run() {
        let (origin, orchestrator) = setup(100);
        origin.set_delay(Duration::from_millis(20)).await;

        let started = orchestrator.spawn_tracked(codes(&["A", "B"])).unwrap();
        let early = get_snapshot(orchestrator.progress_store().as_ref(), &started.task_id).unwrap();
        assert_eq!(early.state.status, TaskStatus::InProgress);

        let done = wait_terminal(&orchestrator, &started.task_id).await;
        assert_eq!(done.state.status, TaskStatus::Completed);
        assert!(done.state.completed_items >= early.state.completed_items);
    }
}
