//! Engine configuration types for PlantFlow.
//!
//! `EngineConfig` represents the `config.toml` that controls action
//! execution and logging. All fields have defaults, so an empty file (or no
//! file at all) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run every action handler inside its own execution scope, with a
    /// fresh handler instance from its factory.
    #[serde(default = "default_action_scopes")]
    pub action_scopes: bool,

    /// Upper bound for a single handler invocation. `None` disables it.
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_action_scopes() -> bool {
    true
}

fn default_action_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_scopes: default_action_scopes(),
            action_timeout_secs: default_action_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Export spans to stdout through OpenTelemetry.
    #[serde(default)]
    pub otel: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            otel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
