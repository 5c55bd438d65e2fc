//! Configuration validation.

use parley_framework::signature::MENTION;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, ParleyConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ParleyConfig) -> ConfigResult<()> {
    validate_prefixes(&config.prefix)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_prefixes(prefixes: &[String]) -> ConfigResult<()> {
    if prefixes.is_empty() {
        return Err(ConfigError::validation(
            "At least one command prefix is required",
        ));
    }

    for prefix in prefixes {
        if prefix.trim().is_empty() {
            return Err(ConfigError::validation(format!(
                "Prefix {prefix:?} is empty; use {MENTION:?} to match mentions"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is \"file\" but logging.file_path is not set",
        ));
    }

    for module in logging.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {module:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_prefixes() {
        let mut config = ParleyConfig::default();
        config.prefix.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));

        config.prefix = vec!["!".into(), "  ".into()];
        assert!(validate_config(&config).is_err());

        config.prefix = vec!["?".into(), MENTION.into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_file_output() {
        let mut config = ParleyConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/parley.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_filter_targets() {
        let mut config = ParleyConfig::default();
        config
            .logging
            .filters
            .insert("parley framework".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
