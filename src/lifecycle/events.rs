//! Named hooks with ordered, synchronous listeners.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::failure::Failure;

/// A registered callback. Captures whatever state it needs.
pub type Listener = Arc<dyn Fn() -> Result<(), Failure> + Send + Sync>;

/// Hook names. The four lifecycle points plus any custom name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeDispatch,
    AfterDispatch,
    BeforeResponse,
    AfterResponse,
    Custom(String),
}

impl Hook {
    pub fn as_str(&self) -> &str {
        match self {
            Hook::BeforeDispatch => "beforeDispatch",
            Hook::AfterDispatch => "afterDispatch",
            Hook::BeforeResponse => "beforeResponse",
            Hook::AfterResponse => "afterResponse",
            Hook::Custom(name) => name,
        }
    }
}

impl From<&str> for Hook {
    fn from(name: &str) -> Self {
        match name {
            "beforeDispatch" => Hook::BeforeDispatch,
            "afterDispatch" => Hook::AfterDispatch,
            "beforeResponse" => Hook::BeforeResponse,
            "afterResponse" => Hook::AfterResponse,
            other => Hook::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps hooks to listeners in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<Hook, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` to `hook`.
    pub fn attach<F>(&self, hook: impl Into<Hook>, listener: F)
    where
        F: Fn() -> Result<(), Failure> + Send + Sync + 'static,
    {
        let hook = hook.into();
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.entry(hook).or_default().push(Arc::new(listener));
    }

    /// Run every listener of `hook` in registration order. The first
    /// failure is returned as is and stops the remaining listeners.
    ///
    /// Listeners attached while this runs are not part of this trigger.
    pub fn trigger(&self, hook: impl Into<Hook>) -> Result<(), Failure> {
        let hook = hook.into();
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners.get(&hook).cloned().unwrap_or_default()
        };

        tracing::trace!(hook = %hook, listeners = snapshot.len(), "Triggering hook");
        for listener in snapshot {
            listener()?;
        }
        Ok(())
    }

    pub fn listener_count(&self, hook: impl Into<Hook>) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.get(&hook.into()).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(hook, list)| (hook.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::AppError;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Listener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = log.clone();
        let make = move |tag: &'static str| -> Listener {
            let log = handle.clone();
            Arc::new(move || {
                log.lock().unwrap().push(tag);
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn runs_in_registration_order_once_each() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let l1 = make("L1");
        let l2 = make("L2");
        bus.attach(Hook::BeforeDispatch, move || l1());
        bus.attach(Hook::BeforeDispatch, move || l2());

        bus.trigger(Hook::BeforeDispatch).unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["L1", "L2"]);
    }

    #[test]
    fn trigger_without_listeners_is_noop() {
        let bus = EventBus::new();
        assert!(bus.trigger(Hook::AfterResponse).is_ok());
        assert!(bus.trigger("neverAttached").is_ok());
    }

    #[test]
    fn listener_failure_propagates_and_stops() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let after = make("after");
        bus.attach("beforeResponse", || Err(Failure::new(AppError::Dispatch("listener".into()))));
        bus.attach("beforeResponse", move || after());

        let failure = bus.trigger(Hook::BeforeResponse).unwrap_err();
        assert_eq!(failure.error().kind(), "dispatch");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn custom_names_match_known_hooks() {
        assert_eq!(Hook::from("afterDispatch"), Hook::AfterDispatch);
        assert_eq!(Hook::from("cacheCleared"), Hook::Custom("cacheCleared".into()));

        let bus = EventBus::new();
        bus.attach("cacheCleared", || Ok(()));
        assert_eq!(bus.listener_count(Hook::Custom("cacheCleared".into())), 1);
        assert_eq!(bus.listener_count(Hook::BeforeDispatch), 0);
    }

    #[test]
    fn listeners_attached_during_trigger_wait_for_next_trigger() {
        let bus = Arc::new(EventBus::new());
        let (log, make) = recorder();
        let late = make("late");
        let inner_bus = Arc::downgrade(&bus);
        let attached = Arc::new(Mutex::new(false));
        bus.attach(Hook::AfterDispatch, move || {
            let mut attached = attached.lock().unwrap();
            if !*attached {
                *attached = true;
                if let Some(bus) = inner_bus.upgrade() {
                    let late = late.clone();
                    bus.attach(Hook::AfterDispatch, move || late());
                }
            }
            Ok(())
        });

        bus.trigger(Hook::AfterDispatch).unwrap();
        assert!(log.lock().unwrap().is_empty());

        bus.trigger(Hook::AfterDispatch).unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["late"]);
    }
}
