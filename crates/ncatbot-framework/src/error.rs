//! Error types for the NcatBot framework.

use thiserror::Error;

use crate::command::spec::ParamType;

/// Boxed error returned by handlers.
pub type BoxError = tower::BoxError;

/// Returned by handlers to signal the outcome of one invocation.
pub type HandlerResult = Result<(), BoxError>;

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while registering a command or filter function. A failed
/// registration leaves the registry untouched.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// A command or alias name is empty or contains whitespace.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The same path is already registered.
    #[error("command '{path}' ({location}) is already registered at {existing_location}")]
    Duplicate {
        path: String,
        location: String,
        existing_location: String,
    },

    /// One path is a word-prefix of the other.
    #[error("command '{path}' ({location}) conflicts with '{existing}' registered at {existing_location}")]
    PathConflict {
        path: String,
        location: String,
        existing: String,
        existing_location: String,
    },

    #[error("command '{command}': required parameter '{required}' follows optional parameter '{optional}'")]
    ParameterOrder {
        command: String,
        required: String,
        optional: String,
    },

    #[error("command '{command}': duplicate name '{name}'")]
    DuplicateName { command: String, name: String },

    #[error("command '{command}': invalid option: {reason}")]
    InvalidOption { command: String, reason: String },

    #[error("command '{command}': default of '{parameter}' is not a valid {expected}")]
    InvalidDefault {
        command: String,
        parameter: String,
        expected: ParamType,
    },

    #[error("command '{command}': option group '{group}' default '{default}' is not one of its choices")]
    OptionGroupDefault {
        command: String,
        group: String,
        default: String,
    },

    #[error("command '{command}': option refers to unknown option group {group_id}")]
    UnknownOptionGroup { command: String, group_id: u32 },

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    /// A pure filter function must carry at least one filter.
    #[error("filter function '{0}' has no filters")]
    MissingFilters(String),
}

impl RegistrationError {
    pub(crate) fn invalid_option(command: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate_name(command: &str, name: &str) -> Self {
        Self::DuplicateName {
            command: command.to_string(),
            name: name.to_string(),
        }
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors surfaced by the trigger engine. Everything else (no match, bind
/// failure, filter rejection, handler failure) is an `Outcome`.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("command prefixes '{first}' and '{second}' overlap")]
    PrefixOverlap { first: String, second: String },

    #[error("invalid trigger configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors reading a typed argument out of an invocation.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("argument '{0}' is missing")]
    Missing(String),

    #[error("argument '{name}' type mismatch: expected '{expected}', got '{got}'")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("plugin instance is missing or has a different type")]
    PluginMismatch,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type RegistrationResult<T> = Result<T, RegistrationError>;

pub type EngineResult<T> = Result<T, EngineError>;

pub type ExtractResult<T> = Result<T, ExtractError>;
