//! One orchestration pass: environment → error boundary → providers →
//! listeners → session → dispatch → normalization → response hooks → send.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use chrono_tz::Tz;

use crate::config::{Config, ConfigError, ValidationError};
use crate::container::{lock, Container, SharedResponse};
use crate::failure::{ErrorTranslator, Failure, FileSink, NullSink, Traced, TranslatorError};
use crate::http::session::{SessionGuard, SESSION_COOKIE};
use crate::http::{Dispatched, Request, Session, Transport};
use crate::lifecycle::environment::{self, Environment};
use crate::lifecycle::events::{EventBus, Hook};
use crate::lifecycle::listeners;
use crate::observability::metrics;
use crate::providers::ProviderRegistry;
use crate::routing::Router;

/// Charset used when `app.encoding` is not configured.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The response went out through the normal path.
    Completed { status: StatusCode },
    /// A failure escaped and the error page was sent instead.
    Failed { kind: &'static str, message: String },
}

/// The lifecycle orchestrator for a single request.
pub struct Kernel {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    request: Request,
    router: Box<dyn Router>,
    session: Box<dyn Session>,
    environment: Option<String>,
    env_strategy: Box<dyn FnOnce() -> Option<String> + Send>,
}

impl Kernel {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        request: Request,
        router: Box<dyn Router>,
        session: Box<dyn Session>,
    ) -> Self {
        Self {
            config,
            registry,
            request,
            router,
            session,
            environment: None,
            env_strategy: Box::new(environment::app_env),
        }
    }

    /// Force the environment, overriding configuration and `APP_ENV`.
    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = Some(name.into());
        self
    }

    /// Replace the `APP_ENV` lookup used when nothing is forced.
    pub fn env_strategy<F>(mut self, strategy: F) -> Self
    where
        F: FnOnce() -> Option<String> + Send + 'static,
    {
        self.env_strategy = Box::new(strategy);
        self
    }

    /// Run the pass and commit the output. Only translator failures are
    /// returned as errors; everything else ends up on the transport.
    pub fn run(self, transport: &mut dyn Transport) -> Result<PassOutcome, TranslatorError> {
        let started = Instant::now();

        let explicit = self
            .environment
            .clone()
            .or_else(|| self.config.settings().app.environment.clone());
        let strategy = self.env_strategy;
        let environment = Environment::detect(explicit.as_deref(), strategy);

        let timezone = resolve_timezone(&self.config.settings().app.timezone);
        let zone = timezone.as_ref().copied().unwrap_or(Tz::UTC);

        let span = tracing::info_span!(
            "pass",
            request_id = %self.request.id(),
            env = %environment,
            method = self.request.method(),
            path = self.request.path(),
        );
        let _entered = span.enter();

        let mut translator = ErrorTranslator::new();
        translator.verbose(environment.is_local());
        match &self.config.settings().error.log {
            Some(path) if !environment.is_local() => {
                translator.logger(FileSink::new(path, zone, environment.current()));
            }
            _ => {
                translator.logger(NullSink);
            }
        }
        translator.register()?;

        let pass = Pass {
            config: self.config,
            registry: self.registry,
            request: self.request,
            router: self.router,
            session: self.session,
            environment,
            timezone,
            started,
        };
        let result = translator.boundary(transport, |transport| pass.execute(transport))?;

        transport
            .flush()
            .map_err(|e| TranslatorError::Fatal(format!("failed to flush response: {}", e)))?;

        let outcome = match (result, translator.handled()) {
            (Some(status), _) => PassOutcome::Completed { status },
            (None, Some(context)) => PassOutcome::Failed {
                kind: context.kind,
                message: context.message.clone(),
            },
            (None, None) => PassOutcome::Failed {
                kind: "unknown",
                message: String::new(),
            },
        };

        let status = match &outcome {
            PassOutcome::Completed { status } => *status,
            PassOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        metrics::record_pass(status.as_u16(), started);
        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = listeners::elapsed_millis(started),
            "Pass finished"
        );

        Ok(outcome)
    }
}

/// State moved under the failure boundary.
struct Pass {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    request: Request,
    router: Box<dyn Router>,
    session: Box<dyn Session>,
    environment: Environment,
    timezone: Result<Tz, ValidationError>,
    started: Instant,
}

impl Pass {
    fn execute(self, transport: &mut dyn Transport) -> Result<StatusCode, Failure> {
        let started = self.started;
        let timezone = self
            .timezone
            .map_err(|e| Failure::new(ConfigError::Validation(vec![e])))?;
        let mut container = Container::new(
            self.environment,
            timezone,
            self.config,
            self.request,
            self.router,
            self.session,
        );

        let providers = container.config.settings().app.providers.clone();
        self.registry.register_all(&providers, &mut container).traced()?;

        let privileged = container.admin || container.env.is_local();
        container.events.attach(
            Hook::BeforeResponse,
            listeners::usage_listener(container.response.clone(), started),
        );
        container.events.attach(
            Hook::BeforeResponse,
            listeners::anti_cache_listener(container.response.clone(), privileged),
        );

        let dispatched = if container.admin {
            let guard = SessionGuard::open(container.session.as_mut()).traced()?;
            let dispatched = dispatch(&container.events, container.router.as_ref(), &container.request);
            let closed = guard.close();
            if let (Err(_), Err(e)) = (&dispatched, &closed) {
                tracing::error!(
                    session_id = container.session.id(),
                    error = %e,
                    "Failed to close session after dispatch failure"
                );
            }
            let dispatched = dispatched.traced()?;
            closed.traced()?;
            dispatched
        } else {
            dispatch(&container.events, container.router.as_ref(), &container.request).traced()?
        };

        let encoding: String = container.config.get("app.encoding", DEFAULT_ENCODING.to_string());
        normalize(&container.response, dispatched, &encoding);

        if container.admin {
            let cookie = format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, container.session.id());
            lock(&container.response).set_header("set-cookie", cookie);
        }

        container.events.trigger(Hook::BeforeResponse).traced()?;

        let response = lock(&container.response).clone();
        response.send(transport)?;

        container.events.trigger(Hook::AfterResponse).traced()?;

        Ok(response.status())
    }
}

fn dispatch(events: &EventBus, router: &dyn Router, request: &Request) -> Result<Dispatched, Failure> {
    events.trigger(Hook::BeforeDispatch).traced()?;
    let dispatched = router.dispatch(request).traced()?;
    events.trigger(Hook::AfterDispatch).traced()?;
    Ok(dispatched)
}

/// Put the dispatch result into the shared response. Plain bodies get an
/// HTML content type with the configured charset.
pub fn normalize(response: &SharedResponse, dispatched: Dispatched, encoding: &str) {
    let mut shared = lock(response);
    match dispatched {
        Dispatched::Response(ready) => *shared = ready,
        Dispatched::Body(body) => {
            shared
                .set_header("content-type", format!("text/html; charset={}", encoding))
                .set_body(body);
        }
    }
}

fn resolve_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;
    use std::sync::Mutex;

    #[test]
    fn plain_body_gets_default_charset() {
        let shared: SharedResponse = Arc::new(Mutex::new(Response::new()));
        normalize(&shared, Dispatched::Body("hello".into()), DEFAULT_ENCODING);

        let response = lock(&shared);
        assert_eq!(response.header("content-type"), Some("text/html; charset=UTF-8"));
        assert_eq!(response.body(), "hello");
    }

    #[test]
    fn ready_response_replaces_shared_one() {
        let shared: SharedResponse = Arc::new(Mutex::new(Response::new()));
        let mut ready = Response::with_status(StatusCode::ACCEPTED);
        ready.set_header("content-type", "application/json").set_body("{}");
        normalize(&shared, Dispatched::Response(ready.clone()), DEFAULT_ENCODING);

        assert_eq!(*lock(&shared), ready);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert_eq!(resolve_timezone("Asia/Tokyo"), Ok(Tz::Asia__Tokyo));
        assert_eq!(
            resolve_timezone("Nowhere/Special"),
            Err(ValidationError::InvalidTimezone("Nowhere/Special".into()))
        );
    }
}
