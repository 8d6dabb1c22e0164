//! Dotted-key access over the loaded configuration.

use serde::de::DeserializeOwned;

use crate::config::loader::ConfigError;
use crate::config::schema::AppConfig;

/// Loaded configuration: the typed schema plus the raw table it came from.
///
/// The raw table keeps keys the schema does not know about, so providers can
/// read their own settings with [`Config::get`].
#[derive(Debug, Clone)]
pub struct Config {
    settings: AppConfig,
    raw: toml::Table,
}

impl Config {
    /// Parse configuration from TOML text. Does not validate.
    ///
    /// Schema defaults are filled into the raw table, so dotted lookups see
    /// the same values as [`Config::settings`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let overlay: toml::Table = toml::from_str(content)?;
        let settings: AppConfig = toml::from_str(content)?;
        let mut raw = settings_table(&settings);
        merge(&mut raw, overlay);
        Ok(Self { settings, raw })
    }

    /// Build a configuration from typed settings.
    pub fn from_settings(settings: AppConfig) -> Self {
        let raw = settings_table(&settings);
        Self { settings, raw }
    }

    /// Typed settings.
    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    /// Look up a raw value by dotted key (e.g., `app.encoding`).
    pub fn value(&self, key: &str) -> Option<&toml::Value> {
        let mut segments = key.split('.');
        let mut current = self.raw.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Read `key` as `T`, falling back to `default` when the key is absent
    /// or holds a value of another type.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.value(key)
            .and_then(|value| value.clone().try_into().ok())
            .unwrap_or(default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(AppConfig::default())
    }
}

impl From<AppConfig> for Config {
    fn from(settings: AppConfig) -> Self {
        Self::from_settings(settings)
    }
}

fn settings_table(settings: &AppConfig) -> toml::Table {
    match toml::Value::try_from(settings) {
        Ok(toml::Value::Table(table)) => table,
        _ => toml::Table::new(),
    }
}

/// Deep-merge `overlay` into `base`; overlay values win.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => merge(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
