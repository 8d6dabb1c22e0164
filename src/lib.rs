//! Request lifecycle kernel: one orchestration pass per request with
//! lifecycle hooks, service providers and a single failure boundary.

pub mod config;
pub mod container;
pub mod failure;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod providers;
pub mod routing;

pub use config::{load_config, AppConfig, Config};
pub use container::Container;
pub use failure::{AppError, ErrorTranslator, Failure, Traced};
pub use http::HttpServer;
pub use lifecycle::{Kernel, PassOutcome};
pub use providers::{Provider, ProviderRegistry};
