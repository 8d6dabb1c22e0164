//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum router with a single fallback handler
//! - Wire up middleware (tracing, request timeout)
//! - Run one kernel pass per request on a blocking worker
//! - Convert the committed response into an axum response
//!
//! # Design Decisions
//! - Passes are synchronous, so they run under `spawn_blocking`
//! - Passes share only the immutable config, registry and route table
//! - Graceful shutdown on Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::http::{store_for, BufferedTransport, Request, Response};
use crate::lifecycle::{Kernel, PassOutcome};
use crate::providers::ProviderRegistry;
use crate::routing::Routes;

/// Largest request body read into a pass.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub routes: Routes,
    pub environment: Option<String>,
}

impl AppState {
    pub fn new(config: Arc<Config>, registry: Arc<ProviderRegistry>, routes: Routes) -> Self {
        Self {
            config,
            registry,
            routes,
            environment: None,
        }
    }

    /// Force the environment of every pass.
    pub fn environment(mut self, name: Option<String>) -> Self {
        self.environment = name;
        self
    }
}

/// HTTP front end running one orchestration pass per request.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let timeout = Duration::from_secs(state.config.settings().server.request_timeout_secs);
        let router = Self::build_router(timeout, state);
        Self { router }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeout: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(pass_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn pass_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    let request = Request::from_parts(&parts, body);
    let request_id = request.id();

    let joined = tokio::task::spawn_blocking(move || {
        let session = store_for(&state.config.settings().session, &request);
        let mut kernel = Kernel::new(
            state.config.clone(),
            state.registry.clone(),
            request,
            Box::new(state.routes.clone()),
            session,
        );
        if let Some(name) = &state.environment {
            kernel = kernel.environment(name.clone());
        }

        let mut transport = BufferedTransport::new();
        kernel
            .run(&mut transport)
            .map(|outcome| (outcome, transport.into_response()))
    })
    .await;

    match joined {
        Ok(Ok((outcome, Some(response)))) => {
            if let PassOutcome::Failed { kind, .. } = &outcome {
                tracing::debug!(request_id = %request_id, kind, "Pass ended with error page");
            }
            into_axum(response)
        }
        Ok(Ok((_, None))) => {
            tracing::error!(request_id = %request_id, "Pass produced no response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Fatal translator error");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Pass worker failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_axum(response: Response) -> axum::response::Response {
    let mut out = axum::response::Response::new(Body::from(response.body().to_string()));
    *out.status_mut() = response.status();
    for (name, value) in response.headers() {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = name, "Skipping invalid response header"),
        }
    }
    out
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
