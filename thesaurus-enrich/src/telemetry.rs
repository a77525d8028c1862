//! Tracing subscriber bootstrap.
//!
//! Library code only emits `tracing` events; binaries call
//! [`init_tracing`] once at startup to decide where they go.

use thesaurus_core::{ConfigError, ThesaurusResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl TelemetryConfig {
    /// Read `THESAURUS_LOG_FORMAT` (`json` or `plain`).
    pub fn from_env() -> ThesaurusResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ThesaurusResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("THESAURUS_LOG_FORMAT") {
            config.format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "plain" | "text" | "" => LogFormat::Plain,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "THESAURUS_LOG_FORMAT".to_string(),
                        value: raw,
                        reason: "expected 'json' or 'plain'".to_string(),
                    }
                    .into())
                }
            };
        }
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Fails if a subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> ThesaurusResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter).map_err(|e| {
            ConfigError::InvalidValue {
                field: "default_filter".to_string(),
                value: config.default_filter.clone(),
                reason: e.to_string(),
            }
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.map_err(|e| ConfigError::InvalidValue {
        field: "tracing".to_string(),
        value: format!("{:?}", config.format),
        reason: format!("failed to install subscriber: {e}"),
    })?;

    tracing::debug!(format = ?config.format, "Tracing initialized");
    Ok(())
}
