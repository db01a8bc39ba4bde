//! Configuration schema definitions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ncatbot_framework::TriggerConfig;

/// Root configuration structure.
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [trigger]
/// prefixes = ["/", "!"]
/// unknown_command_silent = false
///
/// [roles]
/// admin = ["10001", "10002"]
/// root = ["10000"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NcatConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Command trigger settings.
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Role name to the user ids holding it.
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Writes to `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: SpanEventConfig,
    /// Log every dispatched message with its timing.
    pub trace_dispatch: bool,
    pub thread_ids: bool,
    /// Include file and line of each event.
    pub file_location: bool,
    /// Target of `output = "file"`; appended to, never rotated.
    pub file_path: Option<PathBuf>,
    /// Per-module levels, e.g. `ncatbot_framework = "trace"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            trace_dispatch: false,
            thread_ids: false,
            file_location: false,
            file_path: None,
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_through_json() {
        let config = NcatConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["logging"]["level"], "info");
        assert_eq!(value["trigger"]["prefixes"][0], "/");
        let back: NcatConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: NcatConfig = serde_json::from_str(
            r#"{"logging": {"level": "debug"}, "roles": {"admin": ["1"]}}"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.trigger.require_prefix);
        assert_eq!(config.roles["admin"], vec!["1"]);
    }

    #[test]
    fn test_bad_level_rejected() {
        let result: Result<NcatConfig, _> =
            serde_json::from_str(r#"{"logging": {"level": "loud"}}"#);
        assert!(result.is_err());
    }
}
