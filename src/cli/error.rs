//! Error types for CLI operations

use thiserror::Error;

use crate::config::{ConfigError, ConfigUnavailable};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur during command registration, dispatch and execution
#[derive(Error, Debug)]
pub enum CliError {
    /// The arguments did not match the command tree; carries clap's rendered message
    #[error("{0}")]
    Usage(String),

    /// A command that needs configuration could not get it
    #[error(transparent)]
    ConfigUnavailable(#[from] ConfigUnavailable),

    /// Resolving flags or environment values failed
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// An option name or shorthand is already taken on the command or its ancestors
    #[error("Duplicate option '{option}' on command '{command}'")]
    DuplicateOption {
        /// Command the option was declared on
        command: String,
        /// Offending option name or shorthand
        option: String,
    },

    /// A sibling command with the same name is already registered
    #[error("Duplicate command '{0}'")]
    DuplicateCommand(String),

    /// Error executing a command or operation
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid argument or input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CliError {
    /// Create a duplicate-option error
    pub fn duplicate_option(command: impl Into<String>, option: impl Into<String>) -> Self {
        Self::DuplicateOption {
            command: command.into(),
            option: option.into(),
        }
    }
}

// Conversions from common error types
impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::SerdeError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::SerdeError(err.to_string())
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::ExecutionError(format!("{:#}", err))
    }
}
