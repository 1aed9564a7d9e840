//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, LogLevel, LogOutput, LoggingConfig, TernConfig};

/// Validates the entire configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found.
pub fn validate_config(config: &TernConfig) -> ConfigResult<()> {
    validate_api_config(&config.api)?;
    validate_logging_config(&config.logging)?;
    validate_plugin_overrides(config)?;
    Ok(())
}

/// Validates the remote API settings.
fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    if api.base_url.trim().is_empty() {
        return Err(ConfigError::missing_field("api.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| api.base_url.starts_with(s)) {
        return Err(ConfigError::validation(format!(
            "api.base_url must start with one of {valid_schemes:?}, got '{}'",
            api.base_url
        )));
    }

    if api.version.is_empty() {
        return Err(ConfigError::missing_field("api.version"));
    }

    if api.timeout_secs == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (target, level) in &logging.filters {
        if let Err(e) = level.parse::<LogLevel>() {
            return Err(ConfigError::validation(format!(
                "Invalid log level for '{target}': {e}"
            )));
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

/// Plugin overrides are merged into option objects, so each must be one.
fn validate_plugin_overrides(config: &TernConfig) -> ConfigResult<()> {
    for (name, value) in &config.plugins {
        if !value.is_object() {
            return Err(ConfigError::validation(format!(
                "Overrides for plugin '{name}' must be a table"
            )));
        }
    }
    Ok(())
}
