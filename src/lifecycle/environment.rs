//! Environment detection.

use std::fmt;

/// Variable consulted when no explicit environment is configured.
pub const APP_ENV: &str = "APP_ENV";

/// Read `APP_ENV` from the process environment.
pub fn app_env() -> Option<String> {
    std::env::var(APP_ENV).ok()
}

/// The environment a pass runs in (e.g., `local`, `staging`, `production`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
}

impl Environment {
    pub const LOCAL: &'static str = "local";
    pub const PRODUCTION: &'static str = "production";

    /// Explicit override first, then `strategy`, then `production`.
    /// Empty values are ignored.
    pub fn detect<F>(explicit: Option<&str>, strategy: F) -> Self
    where
        F: FnOnce() -> Option<String>,
    {
        let name = explicit
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                strategy()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| Self::PRODUCTION.to_string());
        Self { name }
    }

    /// Detect using the `APP_ENV` process variable.
    pub fn from_process(explicit: Option<&str>) -> Self {
        Self::detect(explicit, app_env)
    }

    pub fn current(&self) -> &str {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        self.name == Self::LOCAL
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins() {
        let env = Environment::detect(Some("staging"), || Some("local".into()));
        assert_eq!(env.current(), "staging");
    }

    #[test]
    fn strategy_used_without_override() {
        let env = Environment::detect(None, || Some("local".into()));
        assert!(env.is_local());

        let env = Environment::detect(Some("  "), || Some("local".into()));
        assert!(env.is_local());
    }

    #[test]
    fn defaults_to_production() {
        let env = Environment::detect(None, || None);
        assert_eq!(env.current(), Environment::PRODUCTION);

        let env = Environment::detect(None, || Some(String::new()));
        assert_eq!(env.to_string(), "production");
    }

    #[test]
    fn process_detection_uses_app_env() {
        assert_eq!(Environment::from_process(None), Environment::detect(None, app_env));
        assert_eq!(Environment::from_process(Some("qa")).current(), "qa");
    }
}
