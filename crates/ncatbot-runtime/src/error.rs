//! Runtime error types.

use thiserror::Error;

use ncatbot_core::EventError;
use ncatbot_framework::EngineError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// The runtime no longer accepts events.
    #[error("Runtime is shutting down")]
    ShuttingDown,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
