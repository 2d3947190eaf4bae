//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, sizes > 0)
//! - Check exclusion paths point into a known payload section
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::GuardConfig;

/// A single semantic violation in the configuration.
#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a valid socket address",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.sanitize.max_length == 0 {
        errors.push(ValidationError::new("sanitize.max_length", "must be > 0"));
    }

    if config.detection.max_body_size == 0 {
        errors.push(ValidationError::new("detection.max_body_size", "must be > 0"));
    }

    for path in &config.detection.excluded_paths {
        let known_section = path.starts_with("body.")
            || path.starts_with("query.")
            || path.starts_with("params.");
        if !known_section {
            errors.push(ValidationError::new(
                "detection.excluded_paths",
                format!("'{path}' must start with body., query. or params."),
            ));
        }
    }

    if config.rate_limit.enabled && config.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            "must be > 0 when rate limiting is enabled",
        ));
    }

    if config.monitor.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "monitor.sweep_interval_secs",
            "must be > 0",
        ));
    }

    if config.monitor.feed_capacity == 0 {
        errors.push(ValidationError::new("monitor.feed_capacity", "must be > 0"));
    }

    if let Some(url) = &config.alerts.webhook_url {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::new(
                "alerts.webhook_url",
                "must be a valid URL",
            ));
        }
    }

    if config.alerts.enabled && config.alerts.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "alerts.timeout_secs",
            "must be > 0 when alerts are enabled",
        ));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must not be empty when the admin surface is enabled",
        ));
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
    fn collects_all_violations() {
        let mut config = GuardConfig::default();
        config.timeouts.request_secs = 0;
        config.sanitize.max_length = 0;
        config.admin.api_key = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_exclusion_outside_known_sections() {
        let mut config = GuardConfig::default();
        config.detection.excluded_paths.push("headers.cookie".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "detection.excluded_paths");
    }

    #[test]
    fn rejects_malformed_webhook_url() {
        let mut config = GuardConfig::default();
        config.alerts.webhook_url = Some("not a url".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "alerts.webhook_url");
    }
}
