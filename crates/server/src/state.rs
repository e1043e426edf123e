use photofinder_core::{
    BatchOrchestrator, Config, DiscoveryEngine, Fetcher, ProgressStore, RenameSessionStore,
    Renamer, SanitizedConfig,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: BatchOrchestrator,
    fetcher: Arc<dyn Fetcher>,
    renamer: Renamer,
    rename_sessions: Arc<RenameSessionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: BatchOrchestrator,
        fetcher: Arc<dyn Fetcher>,
        renamer: Renamer,
        rename_sessions: Arc<RenameSessionStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            fetcher,
            renamer,
            rename_sessions,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn engine(&self) -> &DiscoveryEngine {
        self.orchestrator.engine()
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    pub fn progress_store(&self) -> &dyn ProgressStore {
        self.orchestrator.progress_store().as_ref()
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn renamer(&self) -> &Renamer {
        &self.renamer
    }

    pub fn rename_sessions(&self) -> &RenameSessionStore {
        &self.rename_sessions
    }
}
