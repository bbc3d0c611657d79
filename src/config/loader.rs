//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<EdgeConfig, ConfigError> {
    let config: EdgeConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.locales.fallback, "en");
        assert_eq!(config.locales.cookie_name, "pm_lang");
        assert_eq!(config.geo.tables.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[locales]
supported = ["de", "en", "fr"]
fallback = "fr"

[[geo.tables]]
locale = "fr"
countries = ["FR", "MC"]
regions = {{ BE = ["WAL"], CA = ["QC"] }}
cities = ["Geneva"]

[redirect]
default_max_age_secs = 120
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.locales.fallback, "fr");
        assert_eq!(config.geo.tables.len(), 1);
        assert_eq!(config.geo.tables[0].regions["CA"], vec!["QC".to_string()]);
        assert_eq!(config.redirect.default_max_age_secs, 120);
        assert_eq!(config.redirect.high_confidence_max_age_secs, 1800);
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[locales]\nfallback = \"xx\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("locales.fallback"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[locales"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
