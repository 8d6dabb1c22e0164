//! Providers shipped with the crate.

use axum::http::StatusCode;
use chrono_tz::Tz;
use serde::Serialize;

use crate::container::{lock, Container};
use crate::failure::{AppError, Failure};
use crate::http::{Dispatched, Request, Response, X_REQUEST_ID};
use crate::lifecycle::events::Hook;
use crate::providers::{Extension, Provider};
use crate::routing::Router;

pub const STATUS: &str = "status";
pub const REQUEST_ID: &str = "request-id";

/// Path answered by the status provider.
pub const STATUS_PATH: &str = "/status";

pub fn status() -> Box<dyn Extension> {
    Box::new(StatusProvider)
}

pub fn request_id() -> Box<dyn Extension> {
    Box::new(RequestIdProvider)
}

/// Answers `GET /status` with a JSON summary and serves an index at `/`
/// when the wrapped router has nothing there. Everything else goes to the
/// wrapped router.
pub struct StatusProvider;

impl Provider for StatusProvider {
    fn register(&self, container: &mut Container) -> Result<(), Failure> {
        let environment = container.env.current().to_string();
        let timezone = container.timezone;
        container.wrap_router(move |inner| {
            Box::new(StatusRouter {
                inner,
                environment,
                timezone,
            })
        });
        Ok(())
    }
}

impl Extension for StatusProvider {
    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    name: &'static str,
    version: &'static str,
    environment: &'a str,
    timezone: &'a str,
    request_id: String,
}

struct StatusRouter {
    inner: Box<dyn Router>,
    environment: String,
    timezone: Tz,
}

impl Router for StatusRouter {
    fn dispatch(&self, request: &Request) -> Result<Dispatched, Failure> {
        if request.method() != "GET" {
            return self.inner.dispatch(request);
        }
        match request.path() {
            STATUS_PATH => self.report(request),
            "/" => {
                let dispatched = self.inner.dispatch(request)?;
                match &dispatched {
                    Dispatched::Response(response) if response.status() == StatusCode::NOT_FOUND => {
                        Ok(Dispatched::Body(index_page()))
                    }
                    _ => Ok(dispatched),
                }
            }
            _ => self.inner.dispatch(request),
        }
    }
}

impl StatusRouter {
    fn report(&self, request: &Request) -> Result<Dispatched, Failure> {
        let report = StatusReport {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            environment: &self.environment,
            timezone: self.timezone.name(),
            request_id: request.id().to_string(),
        };
        let body = serde_json::to_string(&report)
            .map_err(|e| Failure::new(AppError::Dispatch(e.to_string())))?;

        let mut response = Response::with_status(StatusCode::OK);
        response
            .set_header("content-type", "application/json")
            .set_body(body);
        Ok(Dispatched::Response(response))
    }
}

fn index_page() -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<body>\n<h1>{} {}</h1>\n\
         <p><a href=\"{}\">status</a></p>\n</body>\n</html>\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        STATUS_PATH
    )
}

/// Echoes the request ID in the `x-request-id` response header.
pub struct RequestIdProvider;

impl Provider for RequestIdProvider {
    fn register(&self, container: &mut Container) -> Result<(), Failure> {
        let response = container.response.clone();
        let id = container.request.id().to_string();
        container.events.attach(Hook::BeforeResponse, move || {
            lock(&response).set_header(X_REQUEST_ID, id.clone());
            Ok(())
        });
        Ok(())
    }
}

impl Extension for RequestIdProvider {
    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}
