//! Explicit dependency-injection context for one orchestration pass.
//!
//! Everything a pass touches lives here and is handed to providers by
//! `&mut`. Nothing is global.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono_tz::Tz;

use crate::config::Config;
use crate::failure::{AppError, Failure};
use crate::http::{Request, Response, Session};
use crate::lifecycle::environment::Environment;
use crate::lifecycle::events::EventBus;
use crate::routing::Router;

/// The response every listener of a pass works on.
pub type SharedResponse = Arc<Mutex<Response>>;

/// Lock a mutex, recovering the data if a panicking listener poisoned it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Services available to providers and the orchestrator.
pub struct Container {
    pub env: Environment,
    pub timezone: Tz,
    pub config: Arc<Config>,
    pub events: EventBus,
    pub router: Box<dyn Router>,
    pub response: SharedResponse,
    pub session: Box<dyn Session>,
    pub request: Request,
    pub admin: bool,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    /// Assemble a container. Admin context is derived from the request path
    /// and `app.admin_prefix`.
    pub fn new(
        env: Environment,
        timezone: Tz,
        config: Arc<Config>,
        request: Request,
        router: Box<dyn Router>,
        session: Box<dyn Session>,
    ) -> Self {
        let admin = is_admin_path(request.path(), &config.settings().app.admin_prefix);
        Self {
            env,
            timezone,
            config,
            events: EventBus::new(),
            router,
            response: Arc::new(Mutex::new(Response::new())),
            session,
            request,
            admin,
            services: HashMap::new(),
        }
    }

    /// Register a named service, replacing any previous one.
    pub fn provide<T: Any + Send + Sync>(&mut self, name: &str, service: T) {
        self.services.insert(name.to_string(), Arc::new(service));
    }

    /// Fetch a named service registered as `T`.
    #[track_caller]
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Failure> {
        self.services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
            .ok_or_else(|| Failure::new(AppError::MissingService(name.to_string())))
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Replace the router with one built around the current router.
    pub fn wrap_router<F>(&mut self, wrap: F)
    where
        F: FnOnce(Box<dyn Router>) -> Box<dyn Router>,
    {
        let inner = std::mem::replace(&mut self.router, Box::new(Unrouted));
        self.router = wrap(inner);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut services: Vec<_> = self.services.keys().collect();
        services.sort();
        f.debug_struct("Container")
            .field("env", &self.env)
            .field("timezone", &self.timezone)
            .field("request_id", &self.request.id())
            .field("admin", &self.admin)
            .field("events", &self.events)
            .field("services", &services)
            .finish_non_exhaustive()
    }
}

fn is_admin_path(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Placeholder that only exists while a router is being wrapped.
struct Unrouted;

impl Router for Unrouted {
    fn dispatch(&self, _request: &Request) -> Result<crate::http::Dispatched, Failure> {
        Err(Failure::new(AppError::MissingService("router".to_string())))
    }
}
