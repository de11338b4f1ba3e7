//! CLI feature - the kubicorn command tree and its dispatcher
//!
//! This module builds the command tree, binds options onto it and dispatches
//! parsed command lines to actions.
//!
//! # Features
//!
//! - **Declarative tree**: Commands are [`CommandNode`]s registered once in a [`CommandRegistry`]
//! - **Layered options**: Flags, `KUBICORN_*` variables, the config file and defaults
//! - **Lazy config**: The config file is read at most once, and only by commands that need it
//! - **Completion**: Scripts for bash, zsh and fish, with custom hints for bash
//!
//! # Architecture
//!
//! A dispatch walks the parsed match chain to a node, resolves the options
//! visible from it and hands the action a [`CommandContext`]:
//! - `CommandRegistry` - The finalized tree, rooted at `kubicorn`
//! - `Dispatcher` - Parsing, config initialization and action invocation
//! - `CommandContext` - Resolved options, logger and streams for one action
//!
//! # Example
//!
//! ```rust,no_run
//! use kubicorn::cli::{CommandRegistry, Dispatcher};
//!
//! let registry = CommandRegistry::new().unwrap();
//! Dispatcher::new(registry).execute().unwrap();
//! ```

#[cfg(feature = "cli")]
pub mod binder;

#[cfg(feature = "cli")]
pub mod commands;

#[cfg(feature = "cli")]
pub mod completion;

#[cfg(feature = "cli")]
pub mod context;

#[cfg(feature = "cli")]
pub mod dispatcher;

#[cfg(feature = "cli")]
pub mod error;

#[cfg(feature = "cli")]
pub mod node;

#[cfg(feature = "cli")]
pub mod profiles;

#[cfg(feature = "cli")]
pub mod registry;

#[cfg(feature = "cli")]
pub mod state;

#[cfg(all(feature = "cli", test))]
pub mod test_utils;

// Re-exports for convenience
#[cfg(feature = "cli")]
pub use error::{CliError, CliResult};

#[cfg(feature = "cli")]
pub use binder::{declare_bool, declare_int, declare_string};

#[cfg(feature = "cli")]
pub use completion::{annotate, AnnotateOutcome};

#[cfg(feature = "cli")]
pub use context::{CommandContext, Streams};

#[cfg(feature = "cli")]
pub use dispatcher::Dispatcher;

#[cfg(feature = "cli")]
pub use node::{CommandNode, CommandSummary, Runnable};

#[cfg(feature = "cli")]
pub use registry::CommandRegistry;
