use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::discovery::{DiscoveryConfig, PatternRules};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub patterns: PatternRules,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub renamer: RenamerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration (rename mappings live here)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("photofinder.db")
}

/// Remote image origin configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// Base path every candidate filename is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for a single existence probe, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Timeout for downloading image bytes, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Browser-like User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            probe_timeout_secs: default_probe_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.borellacasalinghi.it/foto-prodotti/cartella-immagini".to_string()
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

/// Batch search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Batches above this size are rejected before any work starts.
    #[serde(default = "default_max_codes")]
    pub max_codes: usize,
    /// Codes searched at once in concurrent mode.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Pause between codes in sequential mode (milliseconds).
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_codes: default_max_codes(),
            max_concurrency: default_max_concurrency(),
            inter_request_delay_ms: default_inter_request_delay(),
        }
    }
}

fn default_max_codes() -> usize {
    1000
}

fn default_max_concurrency() -> usize {
    16
}

fn default_inter_request_delay() -> u64 {
    150
}

/// Progress tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// How long finished tasks stay readable (seconds).
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// How often the sweeper evicts stale tasks (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_retention() -> u64 {
    600
}

fn default_sweep_interval() -> u64 {
    60
}

/// Photo renaming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenamerConfig {
    /// Spreadsheet holding the code → name mapping (first two columns).
    #[serde(default)]
    pub mapping_url: Option<String>,
    /// Lifetime of an uploaded rename session (seconds).
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Accepted image extensions, lowercase, without the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            mapping_url: None,
            session_ttl_secs: default_session_ttl(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Sanitized config for API responses (mapping URL hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub origin: OriginConfig,
    pub discovery: DiscoveryConfig,
    pub patterns: PatternRules,
    pub batch: BatchConfig,
    pub progress: ProgressConfig,
    pub renamer: SanitizedRenamerConfig,
}

/// Renamer config with the mapping URL reduced to a flag
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRenamerConfig {
    pub mapping_url_configured: bool,
    pub session_ttl_secs: u64,
    pub allowed_extensions: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            origin: config.origin.clone(),
            discovery: config.discovery.clone(),
            patterns: config.patterns.clone(),
            batch: config.batch.clone(),
            progress: config.progress.clone(),
            renamer: SanitizedRenamerConfig {
                mapping_url_configured: config
                    .renamer
                    .mapping_url
                    .as_deref()
                    .is_some_and(|u| !u.trim().is_empty()),
                session_ttl_secs: config.renamer.session_ttl_secs,
                allowed_extensions: config.renamer.allowed_extensions.clone(),
            },
        }
    }
}
