//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => {
                return Err(ConfigError::validation(
                    "logging.file_path is required when logging.output is 'file'",
                ));
            }
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "logging.file_path must name a file: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    if let Some(module) = logging.filters.keys().find(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter target: '{module}'"
        )));
    }

    Ok(())
}
