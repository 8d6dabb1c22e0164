//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Kernel::run (kernel.rs):
//!     Detect environment (environment.rs) → Resolve timezone
//!     → Arm error translator → Build container → Register providers
//!     → Attach built-in listeners (listeners.rs)
//!     → [admin] open session
//!     → beforeDispatch → dispatch → afterDispatch      (events.rs)
//!     → [admin] close session
//!     → Normalize → beforeResponse → send → afterResponse
//!     → Flush transport
//! ```
//!
//! # Design Decisions
//! - One pass per request; nothing survives between passes
//! - A failure anywhere skips the remaining hooks and goes to the translator
//! - The session is closed exactly once, also when dispatch fails or panics

pub mod environment;
pub mod events;
pub mod kernel;
pub mod listeners;

pub use environment::Environment;
pub use events::{EventBus, Hook, Listener};
pub use kernel::{Kernel, PassOutcome, DEFAULT_ENCODING};
