//! kubicorn - Kubernetes cluster management, without any magic
//!
//! This crate is the command shell of kubicorn, split into feature-gated modules:
//!
//! - **`config`** - Option descriptors and layered resolution (flag, env, file, default)
//! - **`observability`** - Leveled logging and the fabulous rainbow writer
//! - **`cli`** - The command tree, option binding, dispatch and shell completion
//!
//! # Features
//!
//! Enable the features you need in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! kubicorn = { version = "0.1", default-features = false, features = ["config"] }
//! # Or enable everything:
//! kubicorn = { version = "0.1", features = ["all"] }
//! ```
//!
//! # Example: Resolving options
//!
//! ```no_run
//! use kubicorn::config::{
//!     persistent_options, ConfigInitializer, EnvironmentLoader, FlagLayer, YamlFileSource,
//!     OptionValue, ENV_PREFIX, VERBOSE,
//! };
//!
//! let env = EnvironmentLoader::new(ENV_PREFIX);
//! let source = YamlFileSource::resolve(None, env.config_path());
//! let init = ConfigInitializer::new(Box::new(source), env);
//!
//! let flags = FlagLayer::new().with("verbose", OptionValue::Int(4));
//! let store = init.resolve(&persistent_options(), &flags).unwrap();
//! assert_eq!(store.get(&VERBOSE).unwrap(), 4);
//! ```
//!
//! # Example: Logging
//!
//! ```
//! use kubicorn::observability::{Level, Logger};
//!
//! let logger = Logger::new(3, false);
//! let mut err = Vec::new();
//! logger.log(&mut err, Level::Info, "Loading cluster").unwrap();
//! logger.log(&mut err, Level::Debug, "hidden at level 3").unwrap();
//! assert!(String::from_utf8(err).unwrap().contains("[✔]  Loading cluster"));
//! ```

#![warn(missing_docs)]

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Command tree and dispatch (enabled with the `cli` feature)
#[cfg(feature = "cli")]
pub mod cli;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "config")]
    pub use crate::config::{ConfigStore, EnvironmentLoader, FlagLayer, OptionKey, OptionValue};

    #[cfg(feature = "observability")]
    pub use crate::observability::{Level, Logger, OutputWriter};

    #[cfg(feature = "cli")]
    pub use crate::cli::{
        CliError, CliResult, CommandContext, CommandNode, CommandRegistry, Dispatcher, Runnable,
    };
}
