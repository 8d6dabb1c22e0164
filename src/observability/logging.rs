//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the default filter from configuration and environment
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `observability.log_level`
//! - `local` raises the default to `debug`
//! - Logs go to stderr so `once` can write the response to stdout

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a level.
pub fn default_directive(level: &str, local: bool) -> String {
    let level = if local { "debug" } else { level };
    format!("anchor={level},tower_http={level}")
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(level: &str, local: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(level, local).into());

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
