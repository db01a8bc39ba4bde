//! NcatBot Runtime - configuration, logging and the event loop.
//!
//! This crate provides:
//! - Layered configuration (`ncatbot.toml`, `NCATBOT_*` environment)
//! - Logging setup driven by the `[logging]` section
//! - [`PluginTable`], an in-process [`PluginHost`](ncatbot_core::PluginHost)
//! - [`NcatRuntime`], which feeds decoded napcat events to the engine
//!
//! # Feature Flags
//!
//! - `toml-config`: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, NcatConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use host::PluginTable;
pub use logging::{LoggingBuilder, LoggingError};
pub use runtime::{NcatRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
