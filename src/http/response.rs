//! Response model and dispatch results.
//!
//! # Responsibilities
//! - Hold status, headers and body while listeners mutate them
//! - Hand the finished response to a `Transport`
//! - Distinguish ready responses from plain bodies returned by a router
//!
//! # Design Decisions
//! - Header names are stored lowercase; setting a header replaces it
//! - Headers keep insertion order so output is deterministic
//! - The response never owns its transport

use std::io;

use axum::http::StatusCode;

use crate::http::transport::Transport;

/// An outgoing HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    /// Empty `200 OK` response.
    pub fn new() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Hand the response to the transport.
    pub fn send(&self, transport: &mut dyn Transport) -> io::Result<()> {
        transport.send(self)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// What a router returns: a ready response or a plain body to be wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Response(Response),
    Body(String),
}

impl From<Response> for Dispatched {
    fn from(response: Response) -> Self {
        Dispatched::Response(response)
    }
}

impl From<String> for Dispatched {
    fn from(body: String) -> Self {
        Dispatched::Body(body)
    }
}

impl From<&str> for Dispatched {
    fn from(body: &str) -> Self {
        Dispatched::Body(body.to_string())
    }
}
