//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the timezone is a known IANA name
//! - Detect providers listed twice
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use chrono_tz::Tz;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("app.encoding must not be empty")]
    EmptyEncoding,

    #[error("app.timezone `{0}` is not a known IANA timezone")]
    InvalidTimezone(String),

    #[error("{field} `{value}` is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("provider `{0}` is listed more than once")]
    DuplicateProvider(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.encoding.trim().is_empty() {
        errors.push(ValidationError::EmptyEncoding);
    }

    if config.app.timezone.parse::<Tz>().is_err() {
        errors.push(ValidationError::InvalidTimezone(config.app.timezone.clone()));
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut seen = HashSet::new();
    for name in &config.app.providers {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::DuplicateProvider(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
