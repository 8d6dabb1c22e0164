//! anchor (v0.1.0)
//!
//! Runs the request lifecycle kernel either once per process (CGI style)
//! or behind an axum HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!     CGI env / HTTP request
//!            │
//!            ▼
//!     ┌─────────────┐    ┌───────────────────┐    ┌─────────────┐
//!     │   Kernel    │───▶│ providers + hooks │───▶│   router    │
//!     │ (one pass)  │    │   (container)     │    │  dispatch   │
//!     └──────┬──────┘    └───────────────────┘    └──────┬──────┘
//!            │                                           │
//!            ▼                                           ▼
//!     ┌─────────────┐                             ┌─────────────┐
//!     │   error     │◀──── any failure/panic ─────│ normalize + │
//!     │ translator  │                             │  send       │
//!     └──────┬──────┘                             └──────┬──────┘
//!            └──────────────▶ transport ◀────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use anchor::config::{load_config, Config};
use anchor::http::server::AppState;
use anchor::http::{HttpServer, Request, WriterTransport};
use anchor::lifecycle::{Environment, Kernel, PassOutcome};
use anchor::observability::{init_logging, init_metrics};
use anchor::providers::ProviderRegistry;
use anchor::routing::{default_routes, Routes};

/// Exit code for an unusable configuration (EX_CONFIG).
const EXIT_CONFIG: u8 = 78;
/// Exit code for a failure inside the error translator (EX_SOFTWARE).
const EXIT_SOFTWARE: u8 = 70;

#[derive(Parser)]
#[command(name = "anchor")]
#[command(about = "Request lifecycle kernel", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "ANCHOR_CONFIG")]
    config: Option<PathBuf>,

    /// Force the environment (overrides config and APP_ENV)
    #[arg(short, long)]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Handle the request described by the CGI environment and exit
    Once,
    /// Serve HTTP, one pass per request
    Serve,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(config) => Arc::new(config),
        Err(e) => {
            init_logging("info", false);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let explicit = cli
        .env
        .clone()
        .or_else(|| config.settings().app.environment.clone());
    let environment = Environment::from_process(explicit.as_deref());
    init_logging(&config.settings().observability.log_level, environment.is_local());

    let registry = Arc::new(ProviderRegistry::with_builtin());
    let routes = default_routes();

    match cli.command.unwrap_or(Command::Once) {
        Command::Once => run_once(config, registry, routes, cli.env),
        Command::Serve => match run_serve(config, registry, routes, cli.env) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Server failed");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_once(
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    routes: Routes,
    environment: Option<String>,
) -> ExitCode {
    let request = Request::from_cgi_env(std::env::vars());
    let session = anchor::http::store_for(&config.settings().session, &request);

    let mut kernel = Kernel::new(config, registry, request, Box::new(routes), session);
    if let Some(name) = environment {
        kernel = kernel.environment(name);
    }

    let mut transport = WriterTransport::new(std::io::stdout().lock());
    match kernel.run(&mut transport) {
        Ok(PassOutcome::Completed { .. }) => ExitCode::SUCCESS,
        Ok(PassOutcome::Failed { kind, .. }) => {
            tracing::debug!(kind, "Error page sent");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal translator error");
            ExitCode::from(EXIT_SOFTWARE)
        }
    }
}

fn run_serve(
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    routes: Routes,
    environment: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        tracing::info!("anchor v{} starting", env!("CARGO_PKG_VERSION"));

        let settings = config.settings();
        if settings.observability.metrics_enabled {
            let addr: SocketAddr = settings.observability.metrics_address.parse()?;
            init_metrics(addr)?;
        }

        let listener = TcpListener::bind(&settings.server.bind_address).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            request_timeout_secs = settings.server.request_timeout_secs,
            providers = ?settings.app.providers,
            "Listening for connections"
        );

        let state = AppState::new(config.clone(), registry, routes).environment(environment);
        HttpServer::new(state).run(listener).await?;

        tracing::info!("Shutdown complete");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
