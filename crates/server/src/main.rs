use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use photofinder_core::progress::spawn_sweeper;
use photofinder_core::{
    load_config, validate_config, BatchOrchestrator, DiscoveryEngine, Fetcher, HttpOrigin,
    InMemoryProgressStore, MappingRefresher, MappingStore, ProgressStore, Prober,
    RenameSessionStore, Renamer, SqliteMappingStore,
};
use photofinder_server::api::create_router;
use photofinder_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();

    // Determine config path
    let config_path = std::env::var("PHOTOFINDER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Image origin: {}", config.origin.base_url);
    info!("Database path: {:?}", config.database.path);

    // One HTTP client serves probes, image downloads and the mapping spreadsheet
    let origin = Arc::new(HttpOrigin::new(&config.origin).context("Failed to build HTTP client")?);
    let prober: Arc<dyn Prober> = origin.clone();
    let fetcher: Arc<dyn Fetcher> = origin;

    // Discovery and batches
    let engine = DiscoveryEngine::from_config(&config, prober);
    info!(
        "Discovery engine ready (probe budget {})",
        engine.probe_budget()
    );

    let progress_store: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::new());
    let sweeper = spawn_sweeper(Arc::clone(&progress_store), &config.progress);

    let orchestrator = BatchOrchestrator::new(
        engine,
        Arc::clone(&progress_store),
        config.batch.clone(),
        &config.progress,
    );

    // Renamer
    let mapping_store: Arc<dyn MappingStore> = Arc::new(
        SqliteMappingStore::new(&config.database.path)
            .context("Failed to open mapping store")?,
    );
    info!("Mapping store initialized ({} mappings)", mapping_store.count()?);

    let refresher = MappingRefresher::new(
        Arc::clone(&mapping_store),
        Arc::clone(&fetcher),
        config.renamer.mapping_url.clone(),
    );
    if !refresher.is_configured() {
        info!("No mapping spreadsheet configured, renaming uses the stored table only");
    }

    let rename_sessions = Arc::new(RenameSessionStore::new(Duration::from_secs(
        config.renamer.session_ttl_secs,
    )));
    let renamer = Renamer::new(
        mapping_store,
        refresher,
        Arc::clone(&rename_sessions),
        &config.renamer,
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        orchestrator,
        fetcher,
        renamer,
        rename_sessions,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sweeper.abort();

    Ok(())
}

/// Registry + env filter + fmt layer; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
