//! Error types for configuration loading and resolution

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("unable to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML
    #[error("unable to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration document is valid YAML but not a key/value mapping
    #[error("config file {} must contain a mapping of option names to values", path.display())]
    NotAMapping { path: PathBuf },

    /// A layer supplied a value that does not fit the option's kind
    #[error("invalid value {value:?} for option '{name}' from {origin}: expected {expected}")]
    InvalidValue {
        name: String,
        value: String,
        origin: &'static str,
        expected: &'static str,
    },

    /// An option was looked up that no node declared
    #[error("option '{0}' is not declared")]
    Undeclared(String),
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        origin: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            origin,
            expected,
        }
    }
}

/// Configuration could not be made available to a command that needs it.
///
/// Carries the rendered cause; the underlying [`ConfigError`] stays cached in
/// the initializer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("configuration unavailable: {reason}")]
pub struct ConfigUnavailable {
    /// Why the configuration could not be resolved
    pub reason: String,
}

impl From<&ConfigError> for ConfigUnavailable {
    fn from(err: &ConfigError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

impl From<ConfigError> for ConfigUnavailable {
    fn from(err: ConfigError) -> Self {
        Self::from(&err)
    }
}
