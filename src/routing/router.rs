//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store routes (exact paths and path prefixes)
//! - Look up the handler for a request and run it
//! - Answer 404 when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction
//! - O(1) exact lookup via HashMap, then longest prefix wins
//! - Explicit 404 response rather than a silent default

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::failure::Failure;
use crate::http::{Dispatched, Request, Response};
use crate::routing::matcher::{Matcher, PathPrefixMatcher};

/// Turns a request into a response or a plain body.
pub trait Router: Send {
    fn dispatch(&self, request: &Request) -> Result<Dispatched, Failure>;
}

impl<F> Router for F
where
    F: Fn(&Request) -> Result<Dispatched, Failure> + Send,
{
    fn dispatch(&self, request: &Request) -> Result<Dispatched, Failure> {
        self(request)
    }
}

/// Route handler.
pub type Handler = Arc<dyn Fn(&Request) -> Result<Dispatched, Failure> + Send + Sync>;

/// A small routing table.
#[derive(Clone, Default)]
pub struct Routes {
    exact: HashMap<String, Handler>,
    prefixes: Vec<(PathPrefixMatcher, Handler)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an exact path.
    pub fn route<F>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Dispatched, Failure> + Send + Sync + 'static,
    {
        self.exact.insert(path.to_string(), Arc::new(handler));
        self
    }

    /// Route every path under `prefix`.
    pub fn prefix<F>(mut self, prefix: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Dispatched, Failure> + Send + Sync + 'static,
    {
        self.prefixes.push((PathPrefixMatcher::new(prefix), Arc::new(handler)));
        // Longest prefix first
        self.prefixes
            .sort_by(|(a, _), (b, _)| b.prefix().len().cmp(&a.prefix().len()));
        self
    }

    fn find(&self, request: &Request) -> Option<&Handler> {
        self.exact.get(request.path()).or_else(|| {
            self.prefixes
                .iter()
                .find(|(matcher, _)| matcher.matches(request))
                .map(|(_, handler)| handler)
        })
    }
}

impl Router for Routes {
    fn dispatch(&self, request: &Request) -> Result<Dispatched, Failure> {
        match self.find(request) {
            Some(handler) => handler(request),
            None => {
                tracing::debug!(path = request.path(), "No route matched");
                let mut response = Response::with_status(StatusCode::NOT_FOUND);
                response
                    .set_header("content-type", "text/plain; charset=UTF-8")
                    .set_body("Not Found");
                Ok(Dispatched::Response(response))
            }
        }
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<_> = self.exact.keys().collect();
        exact.sort();
        let prefixes: Vec<_> = self.prefixes.iter().map(|(m, _)| m.prefix()).collect();
        f.debug_struct("Routes")
            .field("exact", &exact)
            .field("prefixes", &prefixes)
            .finish()
    }
}
