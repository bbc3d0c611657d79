//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (fallback and geo tables reference supported locales)
//! - Validate value ranges (timeouts > 0, confidences in [0, 1])
//! - Check that bot patterns compile and header names are legal
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::EdgeConfig;

/// A single semantic problem with a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed config, collecting every error.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a valid socket address"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if Authority::from_str(&config.upstream.address).is_err() {
        errors.push(ValidationError::new("upstream.address", "not a valid host:port authority"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let locales = &config.locales;
    if locales.supported.is_empty() {
        errors.push(ValidationError::new("locales.supported", "must list at least one locale"));
    }
    if locales.supported.iter().any(|l| l.trim().is_empty() || l.contains('/')) {
        errors.push(ValidationError::new("locales.supported", "locale codes must be non-empty path segments"));
    }
    if !locales.supported.contains(&locales.fallback) {
        errors.push(ValidationError::new(
            "locales.fallback",
            format!("'{}' is not a supported locale", locales.fallback),
        ));
    }
    if locales.cookie_name.is_empty()
        || locales
            .cookie_name
            .chars()
            .any(|c| c.is_whitespace() || c == ';' || c == '=')
    {
        errors.push(ValidationError::new("locales.cookie_name", "not a valid cookie name"));
    }

    for (field, name) in [
        ("geo.country_header", &config.geo.country_header),
        ("geo.region_header", &config.geo.region_header),
        ("geo.city_header", &config.geo.city_header),
    ] {
        if HeaderName::from_str(name).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid header name", name)));
        }
    }
    for (i, table) in config.geo.tables.iter().enumerate() {
        if !locales.supported.contains(&table.locale) {
            errors.push(ValidationError::new(
                format!("geo.tables[{}].locale", i),
                format!("'{}' is not a supported locale", table.locale),
            ));
        }
    }

    for (kind, patterns) in [
        ("bots.definitive_patterns", &config.bots.definitive_patterns),
        ("bots.suspicious_patterns", &config.bots.suspicious_patterns),
    ] {
        for pattern in patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::new(kind, format!("invalid pattern '{}': {}", pattern, e)));
            }
        }
    }

    let redirect = &config.redirect;
    for (field, value) in [
        ("redirect.bot_confidence_gate", redirect.bot_confidence_gate),
        ("redirect.high_confidence_threshold", redirect.high_confidence_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::new(field, "must be within [0, 1]"));
        }
    }

    let analytics = &config.analytics;
    if analytics.enabled {
        if analytics.channel_capacity == 0 {
            errors.push(ValidationError::new("analytics.channel_capacity", "must be greater than 0"));
        }
        if analytics.retention_secs == 0 {
            errors.push(ValidationError::new("analytics.retention_secs", "must be greater than 0"));
        }
        if analytics.purge_interval_secs == 0 {
            errors.push(ValidationError::new("analytics.purge_interval_secs", "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a valid socket address"));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
            errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "not a valid socket address"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&EdgeConfig::default()), Ok(()));
    }

    #[test]
    fn test_fallback_must_be_supported() {
        let mut config = EdgeConfig::default();
        config.locales.fallback = "fr".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "locales.fallback");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = EdgeConfig::default();
        config.locales.supported = vec!["en".into()];
        config.bots.suspicious_patterns.push("[".into());
        config.redirect.bot_confidence_gate = 1.5;
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"geo.tables[0].locale"));
        assert!(fields.contains(&"bots.suspicious_patterns"));
        assert!(fields.contains(&"redirect.bot_confidence_gate"));
        assert!(fields.contains(&"timeouts.request_secs"));
    }

    #[test]
    fn test_admin_requires_real_key() {
        let mut config = EdgeConfig::default();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "admin.api_key");

        config.admin.api_key = "s3cret".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_header_and_cookie_names() {
        let mut config = EdgeConfig::default();
        config.geo.country_header = "bad header".into();
        config.locales.cookie_name = "pm lang".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
