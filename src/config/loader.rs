//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::reader::Config;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and provider resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Service provider \"{0}\" is not registered")]
    UnknownProvider(String),

    #[error("Service provider \"{0}\" must implement the provider capability")]
    NotAProvider(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = Config::from_toml(&content)?;

    validate_config(config.settings()).map_err(ConfigError::Validation)?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\ntimezone = \"Europe/Berlin\"\nproviders = [\"status\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.settings().app.timezone, "Europe/Berlin");
        assert_eq!(config.settings().app.providers, vec!["status".to_string()]);
    }

    #[test]
    fn rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\nencoding = \"\"").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: app.encoding must not be empty");
    }

    #[test]
    fn reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app").unwrap();

        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn reports_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
