//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogFormat, LogOutput, LoggingConfig, NcatConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &NcatConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;

    config
        .trigger
        .validate_prefixes()
        .map_err(|e| ConfigError::validation(format!("trigger: {e}")))?;

    validate_roles(config)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the `json-log` feature",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module name: {module:?}"
        )));
    }

    Ok(())
}

fn validate_roles(config: &NcatConfig) -> ConfigResult<()> {
    for (role, users) in &config.roles {
        if role.trim().is_empty() {
            return Err(ConfigError::validation("Role names cannot be empty"));
        }
        if users.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::validation(format!(
                "Role '{role}' lists an empty user id"
            )));
        }
    }
    Ok(())
}
