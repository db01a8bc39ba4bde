//! Configuration for the NcatBot runtime.
//!
//! Settings come from layered sources (defaults, files, environment) and are
//! validated before the runtime uses them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, NcatConfig, SpanEventConfig,
};
pub use validation::validate_config;
