//! Logging configuration.
//!
//! `CS_LOG` sets the default level and `CS_LOG_FORMAT` picks `human` or
//! `json`. `RUST_LOG`, when set, replaces the level filter entirely.

use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub(crate) const ENV_LOG: &str = "CS_LOG";
pub(crate) const ENV_LOG_FORMAT: &str = "CS_LOG_FORMAT";

/// Where log lines go and how they look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line, event fields flattened.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" | "jsonl" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default level when `RUST_LOG` is unset.
    pub level: LevelFilter,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read `CS_LOG` and `CS_LOG_FORMAT`. Explicit arguments win over the
    /// environment; unparsable values are ignored.
    pub fn from_env(level: Option<LevelFilter>, format: Option<LogFormat>) -> Self {
        let env_level = std::env::var(ENV_LOG)
            .ok()
            .and_then(|value| value.trim().parse::<LevelFilter>().ok());
        let env_format = std::env::var(ENV_LOG_FORMAT)
            .ok()
            .and_then(|value| value.parse::<LogFormat>().ok());

        let defaults = LogConfig::default();
        LogConfig {
            format: format.or(env_format).unwrap_or(defaults.format),
            level: level.or(env_level).unwrap_or(defaults.level),
            timestamps: defaults.timestamps,
        }
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Filter used when `RUST_LOG` does not provide one.
    pub(crate) fn default_filter(&self) -> EnvFilter {
        EnvFilter::default().add_directive(self.level.into())
    }
}
