//! Layered configuration for the command shell.
//!
//! Options are declared once as [`OptionDescriptor`]s and resolved from four
//! layers, highest precedence first:
//!
//! 1. command-line flags
//! 2. `KUBICORN_*` environment variables
//! 3. the YAML configuration file (`~/.kubicorn/kubicorn.cfg` by default)
//! 4. the declared default
//!
//! # Example
//!
//! ```no_run
//! use kubicorn::config::{
//!     persistent_options, ConfigInitializer, EnvironmentLoader, FlagLayer, YamlFileSource,
//!     ENV_PREFIX, VERBOSE,
//! };
//!
//! let env = EnvironmentLoader::new(ENV_PREFIX);
//! let source = YamlFileSource::resolve(None, env.config_path());
//! let init = ConfigInitializer::new(Box::new(source), env);
//!
//! let store = init.resolve(&persistent_options(), &FlagLayer::new()).unwrap();
//! println!("Log level: {}", store.get(&VERBOSE).unwrap());
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod initializer;
pub mod options;
pub mod resolve;

// Re-export main types for convenience
pub use self::config::{default_config_path, expand_path, ConfigSource, FileLayer, YamlFileSource};
pub use self::environment::{EnvironmentLoader, ENV_PREFIX};
pub use self::error::{ConfigError, ConfigResult, ConfigUnavailable};
pub use self::initializer::{ConfigInitializer, InitState};
pub use self::options::{
    persistent_options, OptionDescriptor, OptionKey, OptionKind, OptionType, OptionValue, COLOR,
    FABULOUS, VERBOSE,
};
pub use self::resolve::{resolve, resolve_lenient, ConfigStore, FlagLayer, Resolved, ValueSource};
