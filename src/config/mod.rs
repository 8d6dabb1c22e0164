//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (typed AppConfig + raw table, immutable)
//!     → shared via Arc with every orchestration pass
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload, a pass is short-lived
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Unknown keys are kept in the raw table for providers to read

pub mod loader;
pub mod reader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use reader::Config;
pub use schema::{AppConfig, AppSection, ErrorSection, ObservabilityConfig, ServerConfig, SessionSection};
pub use validation::ValidationError;
