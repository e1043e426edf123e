use super::{types::Config, ConfigError};

/// Upper bound accepted for `discovery.probe_budget`.
pub const MAX_PROBE_BUDGET: u32 = 200;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Origin base URL is an absolute http(s) URL and timeouts are positive
/// - Probe budget and extension list are usable
/// - Batch limits are positive
/// - Range templates fit inside an adjacency window
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let base = config.origin.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(invalid("origin.base_url must be an absolute http(s) URL"));
    }
    if config.origin.probe_timeout_secs == 0 || config.origin.fetch_timeout_secs == 0 {
        return Err(invalid("origin timeouts must be greater than 0"));
    }

    let budget = config.discovery.probe_budget;
    if budget == 0 || budget > MAX_PROBE_BUDGET {
        return Err(ConfigError::ValidationError(format!(
            "discovery.probe_budget must be between 1 and {}",
            MAX_PROBE_BUDGET
        )));
    }
    if config.discovery.extensions.is_empty() {
        return Err(invalid("discovery.extensions cannot be empty"));
    }
    if let Some(ext) = config
        .discovery
        .extensions
        .iter()
        .find(|e| !e.starts_with('.') || e.len() < 2)
    {
        return Err(ConfigError::ValidationError(format!(
            "discovery.extensions entry {:?} must look like \".jpg\"",
            ext
        )));
    }

    if config.batch.max_codes == 0 {
        return Err(invalid("batch.max_codes must be greater than 0"));
    }
    if config.batch.max_concurrency == 0 {
        return Err(invalid("batch.max_concurrency must be greater than 0"));
    }

    for range in &config.patterns.range_templates {
        if range.from > range.to {
            return Err(ConfigError::ValidationError(format!(
                "patterns.range_templates entry {}..{} is reversed",
                range.from, range.to
            )));
        }
        if range.to - range.from >= 5 {
            return Err(ConfigError::ValidationError(format!(
                "patterns.range_templates entry {}..{} spans more than 5 codes",
                range.from, range.to
            )));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
