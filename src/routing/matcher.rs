//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries (`/admin` does not match `/administrator`)
//! - No regex to guarantee O(n) matching

use crate::http::Request;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match req.path().strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}
