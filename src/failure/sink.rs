//! Fallback failure loggers.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use chrono_tz::Tz;

use crate::failure::frames::FailureContext;

/// Receives every captured failure before it is rendered.
pub trait FailureSink: Send + Sync {
    fn record(&self, context: &FailureContext);
}

impl<F> FailureSink for F
where
    F: Fn(&FailureContext) + Send + Sync,
{
    fn record(&self, context: &FailureContext) {
        self(context)
    }
}

/// Discards everything. Used when no error log is configured and in `local`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FailureSink for NullSink {
    fn record(&self, _context: &FailureContext) {}
}

/// Appends one line per failure to a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    timezone: Tz,
    environment: String,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz, environment: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timezone,
            environment: environment.into(),
        }
    }

    fn line(&self, context: &FailureContext) -> String {
        let timestamp = Utc::now().with_timezone(&self.timezone);
        let origin = context
            .origin()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "[{}] {}.{}: {} at {}",
            timestamp.format("%Y-%m-%d %H:%M:%S %Z"),
            self.environment,
            context.kind,
            context.message.replace('\n', " "),
            origin
        )
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl FailureSink for FileSink {
    fn record(&self, context: &FailureContext) {
        // A broken error log must not stop the error page from rendering.
        if let Err(e) = self.append(&self.line(context)) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write error log");
        }
    }
}
