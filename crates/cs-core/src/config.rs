//! Store configuration and its resolution.
//!
//! Resolution order: explicit path → `CS_STORE_CONFIG` → `CS_CONFIG_DIR/store.toml`
//! → XDG config dir → built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cs_common::{Error, Result};
use cs_tree::Settings;
use serde::{Deserialize, Serialize};

use crate::logging::event_names;

const ENV_CONFIG_PATH: &str = "CS_STORE_CONFIG";
const ENV_CONFIG_DIR: &str = "CS_CONFIG_DIR";
const CONFIG_FILENAME: &str = "store.toml";
const APP_NAME: &str = "config-store";

/// Five minutes, the read-lock bound used while binding.
pub const DEFAULT_BIND_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Where the store configuration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path passed by the caller.
    Explicit(PathBuf),
    /// `CS_STORE_CONFIG` or `CS_CONFIG_DIR`.
    Environment(PathBuf),
    /// `~/.config/config-store/store.toml` or the platform equivalent.
    XdgConfig(PathBuf),
    #[default]
    BuiltinDefault,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(path)
            | ConfigSource::Environment(path)
            | ConfigSource::XdgConfig(path) => Some(path),
            ConfigSource::BuiltinDefault => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(_) => write!(f, "explicit path"),
            ConfigSource::Environment(_) => write!(f, "environment variable"),
            ConfigSource::XdgConfig(_) => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Tunables for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Read-lock wait used by `bind`, in milliseconds.
    pub bind_timeout_ms: u64,

    /// Wait used by the guard helpers when the caller passes no timeout.
    pub default_lock_timeout_ms: u64,

    /// Section names copied into every load request.
    pub settings: Settings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            bind_timeout_ms: DEFAULT_BIND_TIMEOUT_MS,
            default_lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            settings: Settings::default(),
        }
    }
}

impl StoreConfig {
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    pub fn default_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.default_lock_timeout_ms)
    }

    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_default_lock_timeout(mut self, timeout: Duration) -> Self {
        self.default_lock_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|err| match err {
            Error::Config(message) => Error::Config(format!("{}: {}", path.display(), message)),
            other => other,
        })
    }

    /// Resolve and read the configuration file, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; missing files
    /// further down the chain are skipped.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let source = resolve(explicit)?;
        let config = match source.path() {
            Some(path) => Self::from_file(path)?,
            None => StoreConfig::default(),
        };
        tracing::debug!(
            event = event_names::CONFIG_RESOLVED,
            source = %source,
            path = ?source.path(),
            "store configuration resolved"
        );
        Ok((config, source))
    }

    fn validate(&self) -> Result<()> {
        if self.settings.parameters.is_empty()
            || self.settings.properties.is_empty()
            || self.settings.attributes.is_empty()
        {
            return Err(Error::Config("section names must not be empty".to_string()));
        }
        if self.settings.parameters == self.settings.properties {
            return Err(Error::Config(format!(
                "parameters and properties share the section name `{}`",
                self.settings.parameters
            )));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Find the configuration file without reading it.
pub fn resolve(explicit: Option<&Path>) -> Result<ConfigSource> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(ConfigSource::Explicit(path.to_path_buf()));
        }
        return Err(Error::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(ConfigSource::Environment(path));
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return Ok(ConfigSource::Environment(path));
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return Ok(ConfigSource::XdgConfig(path));
        }
    }

    Ok(ConfigSource::BuiltinDefault)
}

/// The per-user config directory for the store.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
