//! Inbound request model.
//!
//! # Responsibilities
//! - Carry the request ID (from `x-request-id` or a fresh UUID v4)
//! - Expose method, path, query, headers and cookies to routers
//! - Build from CGI environment variables or from axum request parts
//!
//! # Design Decisions
//! - Request ID assigned as early as possible for tracing
//! - Header names are stored lowercase
//! - The request is read-only once built

use axum::http::request::Parts;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A single inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    id: Uuid,
    method: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: String,
}

impl Request {
    /// Create a request for `uri` (path plus optional `?query`).
    pub fn new(method: impl Into<String>, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (uri, None),
        };
        Self {
            id: Uuid::new_v4(),
            method: method.into().to_ascii_uppercase(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Add a header. A valid `x-request-id` also becomes the request ID.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == X_REQUEST_ID {
            if let Ok(id) = Uuid::parse_str(value.trim()) {
                self.id = id;
            }
        }
        self.headers.push((name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Build from CGI meta-variables (`REQUEST_METHOD`, `REQUEST_URI`,
    /// `HTTP_*`, ...).
    pub fn from_cgi_env<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let lookup = |key: &str| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let method = lookup("REQUEST_METHOD").unwrap_or("GET");
        let uri = match (lookup("REQUEST_URI"), lookup("PATH_INFO")) {
            (Some(uri), _) => uri.to_string(),
            (None, path) => {
                let path = path.unwrap_or("/");
                match lookup("QUERY_STRING").filter(|q| !q.is_empty()) {
                    Some(query) => format!("{}?{}", path, query),
                    None => path.to_string(),
                }
            }
        };

        let mut request = Request::new(method, &uri);
        for (key, value) in &vars {
            if let Some(name) = key.strip_prefix("HTTP_") {
                request = request.with_header(&name.replace('_', "-"), value.clone());
            } else if key == "CONTENT_TYPE" {
                request = request.with_header("content-type", value.clone());
            }
        }
        request
    }

    /// Build from axum request parts.
    pub fn from_parts(parts: &Parts, body: String) -> Self {
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut request = Request::new(parts.method.as_str(), uri).with_body(body);
        for (name, value) in &parts.headers {
            if let Ok(value) = value.to_str() {
                request = request.with_header(name.as_str(), value);
            }
        }
        request
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of cookie `name` from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_query() {
        let request = Request::new("get", "/admin/users?page=2");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/admin/users");
        assert_eq!(request.query(), Some("page=2"));
    }

    #[test]
    fn request_id_header_is_adopted() {
        let id = Uuid::new_v4();
        let request = Request::new("GET", "/").with_header("X-Request-ID", id.to_string());
        assert_eq!(request.id(), id);

        let request = Request::new("GET", "/").with_header("X-Request-ID", "not-a-uuid");
        assert_ne!(request.id(), Uuid::nil());
        assert_eq!(request.header("x-request-id"), Some("not-a-uuid"));
    }

    #[test]
    fn parses_cookies() {
        let request = Request::new("GET", "/").with_header("Cookie", "a=1; anchor_session=abc; b=2");
        assert_eq!(request.cookie("anchor_session"), Some("abc"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn builds_from_cgi_env() {
        let vars = vec![
            ("REQUEST_METHOD".to_string(), "POST".to_string()),
            ("PATH_INFO".to_string(), "/admin".to_string()),
            ("QUERY_STRING".to_string(), "x=1".to_string()),
            ("HTTP_USER_AGENT".to_string(), "curl".to_string()),
            ("CONTENT_TYPE".to_string(), "text/plain".to_string()),
        ];
        let request = Request::from_cgi_env(vars);
        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), "/admin");
        assert_eq!(request.query(), Some("x=1"));
        assert_eq!(request.header("user-agent"), Some("curl"));
        assert_eq!(request.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn builds_from_axum_parts() {
        let (parts, _) = axum::http::Request::builder()
            .method("PUT")
            .uri("http://example.com/items?id=4")
            .header("Host", "example.com")
            .body(())
            .unwrap()
            .into_parts();
        let request = Request::from_parts(&parts, "payload".into());
        assert_eq!(request.method(), "PUT");
        assert_eq!(request.path(), "/items");
        assert_eq!(request.query(), Some("id=4"));
        assert_eq!(request.header("host"), Some("example.com"));
        assert_eq!(request.body(), "payload");
    }
}
