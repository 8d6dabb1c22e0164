//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bootstrap.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for one application.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Application settings (environment, timezone, providers).
    pub app: AppSection,

    /// Error translator settings.
    pub error: ErrorSection,

    /// Session store settings.
    pub session: SessionSection,

    /// HTTP front end settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Application settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppSection {
    /// Explicit environment override. Wins over `APP_ENV`.
    pub environment: Option<String>,

    /// IANA timezone name (e.g., "Europe/London").
    pub timezone: String,

    /// Charset used when a plain body is wrapped into a response.
    pub encoding: String,

    /// Service providers, registered in this exact order.
    pub providers: Vec<String>,

    /// Requests whose path starts with this prefix run in the admin context.
    pub admin_prefix: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            environment: None,
            timezone: "UTC".to_string(),
            encoding: "UTF-8".to_string(),
            providers: Vec::new(),
            admin_prefix: "/admin".to_string(),
        }
    }
}

/// Error translator settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ErrorSection {
    /// File that captured failures are appended to. Ignored in `local`.
    pub log: Option<PathBuf>,
}

/// Session store settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SessionSection {
    /// Directory for file-backed sessions. In-memory sessions when unset.
    pub path: Option<PathBuf>,
}

/// HTTP front end configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
