//! Failure capture and translation subsystem.
//!
//! # Data Flow
//! ```text
//! any step of a pass returns Err(Failure) or panics
//!     → Failure carries origin frame + frames appended while propagating (Traced)
//!     → translator.rs (single top-level boundary, armed → handling)
//!     → frames.rs (FailureContext, frames deduplicated by file+line)
//!     → sink.rs (fallback logger: file or no-op)
//!     → view.rs (HTML error page, verbose only in `local`)
//!     → Transport (500 status unless headers already sent)
//! ```
//!
//! # Design Decisions
//! - Nothing below the translator recovers a failure
//! - Frames come from `#[track_caller]`, not from parsing backtraces
//! - Failures inside the translator itself are fatal

pub mod frames;
pub mod sink;
pub mod translator;
pub mod view;

use std::fmt;
use std::panic::Location;

use crate::config::ConfigError;

pub use frames::{FailureContext, StackFrame};
pub use sink::{FailureSink, FileSink, NullSink};
pub use translator::{ErrorTranslator, TranslatorError, TranslatorState};

/// Everything that can go wrong during a pass.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Listener on {hook} failed: {message}")]
    Listener { hook: String, message: String },

    #[error("Service \"{0}\" has not been registered")]
    MissingService(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Panic: {0}")]
    Panic(String),
}

impl AppError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Dispatch(_) => "dispatch",
            AppError::Session(_) => "session",
            AppError::Listener { .. } => "listener",
            AppError::MissingService(_) => "missing_service",
            AppError::Io(_) => "io",
            AppError::Panic(_) => "panic",
        }
    }
}

/// A propagating failure: the error plus where it was raised and the
/// call sites it passed through on its way up.
#[derive(Debug)]
pub struct Failure {
    error: AppError,
    origin: StackFrame,
    chain: Vec<StackFrame>,
}

impl Failure {
    /// Create a failure whose origin is the caller's location.
    #[track_caller]
    pub fn new(error: impl Into<AppError>) -> Self {
        Self::at(error, StackFrame::from(Location::caller()))
    }

    /// Create a failure with an explicit origin.
    pub fn at(error: impl Into<AppError>, origin: StackFrame) -> Self {
        Self {
            error: error.into(),
            origin,
            chain: Vec::new(),
        }
    }

    /// Shorthand for a dispatch failure raised at the caller's location.
    #[track_caller]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::new(AppError::Dispatch(message.into()))
    }

    /// Shorthand for a listener failure raised at the caller's location.
    #[track_caller]
    pub fn listener(hook: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::new(AppError::Listener {
            hook: hook.to_string(),
            message: message.into(),
        })
    }

    /// Append a call-chain frame.
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.chain.push(frame);
        self
    }

    pub fn error(&self) -> &AppError {
        &self.error
    }

    pub fn origin(&self) -> &StackFrame {
        &self.origin
    }

    /// Frames appended while propagating, innermost first.
    pub fn chain(&self) -> &[StackFrame] {
        &self.chain
    }

    /// Build the deduplicated rendering context.
    pub fn context(&self) -> FailureContext {
        FailureContext::collect(
            self.error.to_string(),
            self.error.kind(),
            std::iter::once(&self.origin).chain(self.chain.iter()),
        )
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.error, self.origin)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<AppError> for Failure {
    #[track_caller]
    fn from(error: AppError) -> Self {
        Self::new(error)
    }
}

impl From<ConfigError> for Failure {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        Self::new(error)
    }
}

impl From<std::io::Error> for Failure {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        Self::new(error)
    }
}

/// Records the current call site on a failure as it propagates.
pub trait Traced<T> {
    fn traced(self) -> Result<T, Failure>;
}

impl<T> Traced<T> for Result<T, Failure> {
    #[track_caller]
    fn traced(self) -> Result<T, Failure> {
        match self {
            Ok(value) => Ok(value),
            Err(failure) => Err(failure.with_frame(StackFrame::from(Location::caller()))),
        }
    }
}
