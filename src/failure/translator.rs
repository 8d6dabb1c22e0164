//! Top-level failure boundary.
//!
//! # States
//! - Idle: constructed, not yet registered
//! - Armed: registered, no failure seen
//! - Handling: exactly one failure is being rendered (terminal)
//!
//! # State Transitions
//! ```text
//! Idle → Armed: register()
//! Armed → Handling: handle() / boundary() catches a failure or panic
//! Handling → (none): a second failure is fatal
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;

use axum::http::StatusCode;

use crate::failure::frames::{FailureContext, StackFrame};
use crate::failure::sink::{FailureSink, NullSink};
use crate::failure::view;
use crate::failure::{AppError, Failure};
use crate::http::{Response, Transport};
use crate::observability::metrics;

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<StackFrame>> = const { RefCell::new(None) };
    static IN_BOUNDARY: Cell<bool> = const { Cell::new(false) };
}

/// Translator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Idle,
    Armed,
    Handling,
}

/// Errors from the translator itself. All of them end the process.
#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    #[error("Error translator is already registered")]
    AlreadyRegistered,

    #[error("Error translator is not armed (state: {0:?})")]
    NotArmed(TranslatorState),

    #[error("Fatal failure while translating an error: {0}")]
    Fatal(String),
}

/// Converts an uncaught failure into a rendered 500 response.
pub struct ErrorTranslator {
    state: TranslatorState,
    verbose: bool,
    sink: Box<dyn FailureSink>,
    handled: Option<FailureContext>,
}

impl ErrorTranslator {
    pub fn new() -> Self {
        Self {
            state: TranslatorState::Idle,
            verbose: false,
            sink: Box::new(NullSink),
            handled: None,
        }
    }

    /// Show message and frames on the error page.
    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Set the fallback logger invoked for every captured failure.
    pub fn logger(&mut self, sink: impl FailureSink + 'static) -> &mut Self {
        self.sink = Box::new(sink);
        self
    }

    /// Arm the translator and install the process panic hook.
    pub fn register(&mut self) -> Result<(), TranslatorError> {
        if self.state != TranslatorState::Idle {
            return Err(TranslatorError::AlreadyRegistered);
        }
        install_panic_hook();
        self.state = TranslatorState::Armed;
        Ok(())
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    /// Context of the failure that was handled, if any.
    pub fn handled(&self) -> Option<&FailureContext> {
        self.handled.as_ref()
    }

    /// Run `f` under the boundary. An `Err` or a panic escaping `f` is
    /// handled and `Ok(None)` is returned.
    pub fn boundary<T, F>(
        &mut self,
        transport: &mut dyn Transport,
        f: F,
    ) -> Result<Option<T>, TranslatorError>
    where
        F: FnOnce(&mut dyn Transport) -> Result<T, Failure>,
    {
        if self.state != TranslatorState::Armed {
            return Err(TranslatorError::NotArmed(self.state));
        }

        let outer = IN_BOUNDARY.with(|flag| flag.replace(true));
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *transport)));
        IN_BOUNDARY.with(|flag| flag.set(outer));
        match result {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(failure)) => {
                self.handle(failure, transport)?;
                Ok(None)
            }
            Err(payload) => {
                let failure = failure_from_panic(payload);
                self.handle(failure, transport)?;
                Ok(None)
            }
        }
    }

    /// Render `failure` through `transport`.
    pub fn handle(
        &mut self,
        failure: Failure,
        transport: &mut dyn Transport,
    ) -> Result<(), TranslatorError> {
        match self.state {
            TranslatorState::Armed => {}
            TranslatorState::Handling => {
                return Err(TranslatorError::Fatal(format!("nested failure: {}", failure)));
            }
            state => return Err(TranslatorError::NotArmed(state)),
        }
        self.state = TranslatorState::Handling;

        transport.discard_buffer();

        let context = failure.context();
        self.sink.record(&context);
        tracing::error!(
            kind = context.kind,
            origin = %failure.origin(),
            frames = context.frames.len(),
            "{}",
            failure.error()
        );
        metrics::record_failure(context.kind);

        let page = view::render(&context, self.verbose);
        let sent = if transport.headers_sent() {
            transport.write_body(&page)
        } else {
            let mut response = Response::with_status(StatusCode::INTERNAL_SERVER_ERROR);
            response
                .set_header("content-type", "text/html; charset=UTF-8")
                .set_body(page);
            response.send(transport)
        };
        sent.map_err(|e| TranslatorError::Fatal(format!("failed to send error page: {}", e)))?;

        self.handled = Some(context);
        Ok(())
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(StackFrame::from(location)));
            }
            // Panics caught by a boundary are rendered and logged there.
            if !in_boundary() {
                previous(info);
            }
        }));
    });
}

fn in_boundary() -> bool {
    IN_BOUNDARY.with(Cell::get)
}

#[track_caller]
fn failure_from_panic(payload: Box<dyn Any + Send>) -> Failure {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    let origin = LAST_PANIC
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| StackFrame::from(Location::caller()));
    Failure::at(AppError::Panic(message), origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::BufferedTransport;
    use std::sync::{Arc, Mutex};

    fn armed() -> ErrorTranslator {
        let mut translator = ErrorTranslator::new();
        translator.register().unwrap();
        translator
    }

    #[test]
    fn register_twice_is_rejected() {
        let mut translator = armed();
        assert_eq!(translator.state(), TranslatorState::Armed);
        assert!(matches!(translator.register(), Err(TranslatorError::AlreadyRegistered)));
    }

    #[test]
    fn boundary_requires_registration() {
        let mut translator = ErrorTranslator::new();
        let mut transport = BufferedTransport::new();
        let result = translator.boundary(&mut transport, |_| Ok(()));
        assert!(matches!(result, Err(TranslatorError::NotArmed(TranslatorState::Idle))));
    }

    #[test]
    fn passes_values_through() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();
        let value = translator.boundary(&mut transport, |_| Ok(7)).unwrap();
        assert_eq!(value, Some(7));
        assert_eq!(translator.state(), TranslatorState::Armed);
    }

    #[test]
    fn failure_becomes_500_and_discards_partial_output() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();

        let result: Option<()> = translator
            .boundary(&mut transport, |t| {
                let mut partial = Response::new();
                partial.set_body("half a page");
                partial.send(t)?;
                Err(Failure::dispatch("exploded"))
            })
            .unwrap();

        assert!(result.is_none());
        assert_eq!(translator.state(), TranslatorState::Handling);
        let response = transport.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body().contains("half a page"));
        assert!(!response.body().contains("exploded"));
    }

    #[test]
    fn verbose_page_shows_message() {
        let mut translator = ErrorTranslator::new();
        translator.verbose(true).register().unwrap();
        let mut transport = BufferedTransport::new();

        translator
            .boundary(&mut transport, |_| -> Result<(), Failure> { Err(Failure::dispatch("exploded")) })
            .unwrap();

        let body = transport.into_response().unwrap().body().to_string();
        assert!(body.contains("exploded"));
        assert!(body.contains(file!()));
    }

    #[test]
    fn sink_sees_every_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let mut translator = ErrorTranslator::new();
        translator.logger(move |ctx: &FailureContext| captured.lock().unwrap().push(ctx.kind));
        translator.register().unwrap();

        let mut transport = BufferedTransport::new();
        translator
            .boundary(&mut transport, |_| -> Result<(), Failure> {
                Err(Failure::new(AppError::Session("locked".into())))
            })
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), ["session"]);
    }

    #[test]
    fn panics_are_captured_with_location() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();

        let result: Option<()> = translator
            .boundary(&mut transport, |_| panic!("listener blew up"))
            .unwrap();

        assert!(result.is_none());
        let context = translator.handled().unwrap();
        assert_eq!(context.kind, "panic");
        assert_eq!(context.message, "Panic: listener blew up");
        assert_eq!(context.origin().unwrap().file, file!());
        assert_eq!(
            transport.into_response().unwrap().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn second_failure_is_fatal() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();
        translator.handle(Failure::dispatch("first"), &mut transport).unwrap();

        let err = translator.handle(Failure::dispatch("second"), &mut transport).unwrap_err();
        assert!(matches!(err, TranslatorError::Fatal(_)));
    }

    #[test]
    fn headers_already_sent_appends_page() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();
        let mut ok = Response::new();
        ok.set_body("done");
        ok.send(&mut transport).unwrap();
        transport.flush().unwrap();

        translator.handle(Failure::dispatch("late"), &mut transport).unwrap();

        let response = transport.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().starts_with("done"));
        assert!(response.body().contains("Internal Server Error"));
    }

    #[test]
    fn boundary_flag_scoped_to_closure() {
        let mut translator = armed();
        let mut transport = BufferedTransport::new();
        assert!(!in_boundary());

        let seen = translator
            .boundary(&mut transport, |_| Ok(in_boundary()))
            .unwrap();
        assert_eq!(seen, Some(true));
        assert!(!in_boundary());

        let mut translator = armed();
        let caught = translator
            .boundary(&mut transport, |_| -> Result<(), Failure> { panic!("quiet") })
            .unwrap();
        assert!(caught.is_none());
        assert!(!in_boundary());
    }
}
