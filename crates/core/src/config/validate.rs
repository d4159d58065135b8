use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::orchestrator::AutomationConfig;

/// Validate configuration
/// Currently validates:
/// - HTTP port is not 0
/// - Automation settings (see `validate_automation`)
/// - Library servers have unique names, http(s) URLs, API keys and a page size
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.http.port == 0 {
        return Err(ConfigError::ValidationError(
            "http.port cannot be 0".to_string(),
        ));
    }

    validate_automation(&config.automation)?;

    let mut names = HashSet::new();
    for server in &config.servers {
        if server.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "servers[].name cannot be empty".to_string(),
            ));
        }
        if !names.insert(server.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate server name: {}",
                server.name
            )));
        }
        if !(server.url.starts_with("http://") || server.url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "server {}: url must start with http:// or https://",
                server.name
            )));
        }
        if server.api_key.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "server {}: api_key cannot be empty",
                server.name
            )));
        }
        if server.page_size == 0 {
            return Err(ConfigError::ValidationError(format!(
                "server {}: page_size must be at least 1",
                server.name
            )));
        }
    }

    Ok(())
}

/// Validate automation settings, also used for runtime updates.
pub fn validate_automation(automation: &AutomationConfig) -> Result<(), ConfigError> {
    if automation.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "automation.interval_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
