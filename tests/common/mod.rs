//! Shared fakes for lifecycle and server tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anchor::config::Config;
use anchor::container::Container;
use anchor::failure::{AppError, Failure};
use anchor::http::{BufferedTransport, Request, Response, Session};
use anchor::lifecycle::{Hook, Kernel, PassOutcome};
use anchor::providers::{Extension, Provider, ProviderRegistry};
use anchor::routing::Router;

thread_local! {
    static TRACE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Record an event on the current thread.
pub fn trace(event: impl Into<String>) {
    TRACE.with(|trace| trace.borrow_mut().push(event.into()));
}

/// Take and clear the events recorded on the current thread.
pub fn take_trace() -> Vec<String> {
    TRACE.with(|trace| std::mem::take(&mut *trace.borrow_mut()))
}

/// Attaches a listener to each standard hook that records the hook name.
pub struct TraceProvider;

impl Provider for TraceProvider {
    fn register(&self, container: &mut Container) -> Result<(), Failure> {
        for hook in [
            Hook::BeforeDispatch,
            Hook::AfterDispatch,
            Hook::BeforeResponse,
            Hook::AfterResponse,
        ] {
            let name = hook.as_str().to_string();
            container.events.attach(hook, move || {
                trace(name.clone());
                Ok(())
            });
        }
        Ok(())
    }
}

impl Extension for TraceProvider {
    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}

/// Fails while registering.
pub struct FailingProvider;

impl Provider for FailingProvider {
    fn register(&self, _container: &mut Container) -> Result<(), Failure> {
        Err(Failure::dispatch("provider exploded"))
    }
}

impl Extension for FailingProvider {
    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}

/// Attaches a `beforeResponse` listener that always fails.
pub struct FailingListenerProvider;

impl Provider for FailingListenerProvider {
    fn register(&self, container: &mut Container) -> Result<(), Failure> {
        container.events.attach(Hook::BeforeResponse, || {
            Err(Failure::listener(Hook::BeforeResponse, "listener exploded"))
        });
        Ok(())
    }
}

impl Extension for FailingListenerProvider {
    fn as_provider(&self) -> Option<&dyn Provider> {
        Some(self)
    }
}

/// Built-in providers plus the fakes above.
pub fn registry() -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::with_builtin();
    registry.insert("trace", || Box::new(TraceProvider) as Box<dyn Extension>);
    registry.insert("failing", || Box::new(FailingProvider) as Box<dyn Extension>);
    registry.insert("failing-listener", || {
        Box::new(FailingListenerProvider) as Box<dyn Extension>
    });
    Arc::new(registry)
}

/// Session counting how often it was started and closed.
pub struct CountingSession {
    open: bool,
    pub starts: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl CountingSession {
    pub fn new() -> Self {
        Self {
            open: false,
            starts: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handles to the start and close counters.
    pub fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (self.starts.clone(), self.closes.clone())
    }
}

impl Session for CountingSession {
    fn id(&self) -> &str {
        "counting"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn start(&mut self) -> Result<(), Failure> {
        self.open = true;
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Failure> {
        self.open = false;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session that starts fine but fails to close.
pub struct FailingCloseSession;

impl Session for FailingCloseSession {
    fn id(&self) -> &str {
        "failing-close"
    }

    fn is_open(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), Failure> {
        Err(Failure::new(AppError::Session("disk full".into())))
    }
}

/// In-memory writer for capturing `tracing` output.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn config(toml: &str) -> Arc<Config> {
    Arc::new(Config::from_toml(toml).unwrap())
}

/// Run one pass with `APP_ENV` ignored and return the outcome and the
/// committed response.
pub fn run_pass<R>(
    config: Arc<Config>,
    request: Request,
    router: R,
    session: Box<dyn Session>,
) -> (PassOutcome, Response)
where
    R: Router + 'static,
{
    let mut transport = BufferedTransport::new();
    let outcome = Kernel::new(config, registry(), request, Box::new(router), session)
        .env_strategy(|| None)
        .run(&mut transport)
        .unwrap();
    let response = transport.into_response().unwrap();
    (outcome, response)
}
