//! Stack frames and the deduplicated failure context.

use std::collections::HashSet;
use std::fmt;
use std::panic::Location;

use serde::Serialize;

/// One point in a failure's call chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl From<&Location<'_>> for StackFrame {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// What the error view renders: message plus unique frames in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureContext {
    pub message: String,
    pub kind: &'static str,
    pub frames: Vec<StackFrame>,
}

impl FailureContext {
    pub fn collect<'a>(
        message: impl Into<String>,
        kind: &'static str,
        frames: impl IntoIterator<Item = &'a StackFrame>,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            frames: dedup_frames(frames),
        }
    }

    /// The site the failure was raised at.
    pub fn origin(&self) -> Option<&StackFrame> {
        self.frames.first()
    }
}

/// Drop repeated `file+line` pairs, keeping the first occurrence.
pub fn dedup_frames<'a>(frames: impl IntoIterator<Item = &'a StackFrame>) -> Vec<StackFrame> {
    let mut seen = HashSet::new();
    frames
        .into_iter()
        .filter(|frame| seen.insert((frame.file.as_str(), frame.line)))
        .cloned()
        .collect()
}
