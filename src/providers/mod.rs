//! Service provider subsystem.
//!
//! # Data Flow
//! ```text
//! app.providers = ["status", "request-id", ...]
//!     → ProviderRegistry (name → constructor, filled in code)
//!     → construct with no arguments
//!     → capability check (Extension::as_provider)
//!     → Provider::register(&mut Container)
//! ```
//!
//! # Design Decisions
//! - Registration order is configuration order; later providers may rely
//!   on what earlier ones registered
//! - Fail fast: the first unknown name, non-provider or failing register
//!   aborts startup; nothing after it is registered

pub mod builtin;

use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::container::Container;
use crate::failure::{Failure, Traced};

/// Registers capabilities into the container at startup.
pub trait Provider {
    fn register(&self, container: &mut Container) -> Result<(), Failure>;
}

/// Anything the registry can construct. Only providers can be registered.
pub trait Extension {
    fn as_provider(&self) -> Option<&dyn Provider> {
        None
    }
}

/// Builds an extension with no arguments.
pub type Constructor = fn() -> Box<dyn Extension>;

/// Name → constructor table.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in providers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(builtin::STATUS, builtin::status);
        registry.insert(builtin::REQUEST_ID, builtin::request_id);
        registry
    }

    /// Add a constructor, returning the one it replaced.
    pub fn insert(&mut self, name: &str, constructor: Constructor) -> Option<Constructor> {
        self.constructors.insert(name.to_string(), constructor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Construct and register every provider in `names`, in order.
    pub fn register_all(&self, names: &[String], container: &mut Container) -> Result<usize, Failure> {
        for name in names {
            let construct = self
                .constructors
                .get(name)
                .ok_or_else(|| Failure::new(ConfigError::UnknownProvider(name.clone())))?;
            let extension = construct();
            let provider = extension
                .as_provider()
                .ok_or_else(|| Failure::new(ConfigError::NotAProvider(name.clone())))?;

            provider.register(container).traced()?;
            tracing::debug!(provider = %name, "Service provider registered");
        }
        Ok(names.len())
    }
}
