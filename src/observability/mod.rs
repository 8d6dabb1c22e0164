//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every pass produces:
//!     → logging.rs (structured log events inside a per-request span)
//!     → metrics.rs (pass counter, latency histogram, failure counter)
//!
//! Consumers:
//!     → stderr (log lines; stdout is reserved for the response in `once`)
//!     → Metrics endpoint (Prometheus scrape, `serve` only)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a pass via the span
//! - Metric updates without an installed recorder are no-ops

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
