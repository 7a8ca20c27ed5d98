//! Structured logging for the store.
//!
//! All store events go through `tracing` with an `event` field naming what
//! happened (see [`event_names`]) plus the document name and whatever else is
//! relevant. Output goes to stderr, either human-readable or JSON lines.
//!
//! ```ignore
//! use cs_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! ```

pub mod config;

pub use config::{LogConfig, LogFormat};

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Standard event names used in logging.
pub mod event_names {
    // Document cache
    pub const STORE_LOADED: &str = "store.loaded";
    pub const STORE_CACHE_HIT: &str = "store.cache_hit";
    pub const STORE_LOAD_FAILED: &str = "store.load_failed";
    pub const STORE_VERSION_MISMATCH: &str = "store.version_mismatch";
    pub const STORE_MODIFIED: &str = "store.modified";

    // Locks
    pub const LOCK_ACQUIRED: &str = "lock.acquired";
    pub const LOCK_TIMEOUT: &str = "lock.timeout";
    pub const LOCK_RELEASED: &str = "lock.released";
    pub const LOCK_RELEASE_IGNORED: &str = "lock.release_ignored";

    // Binding
    pub const BIND_CACHE_HIT: &str = "bind.cache_hit";
    pub const BIND_COMPLETED: &str = "bind.completed";
    pub const BIND_UPDATED: &str = "bind.updated";
    pub const BIND_FAILED: &str = "bind.failed";

    // Configuration
    pub const CONFIG_RESOLVED: &str = "config.resolved";
}

/// Install the global subscriber.
///
/// Call once at startup. An explicit `RUST_LOG` filter wins over
/// `config.level`.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.default_filter());

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}

/// Initialize logging from the environment alone.
pub fn init_default_logging() {
    init_logging(&LogConfig::from_env(None, None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_namespaced() {
        for name in [
            event_names::STORE_LOADED,
            event_names::STORE_VERSION_MISMATCH,
            event_names::LOCK_TIMEOUT,
            event_names::BIND_COMPLETED,
            event_names::CONFIG_RESOLVED,
        ] {
            let (scope, what) = name.split_once('.').unwrap();
            assert!(!scope.is_empty() && !what.is_empty(), "{name}");
        }
    }
}
