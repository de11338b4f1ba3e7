//! Built-in commands.
//!
//! Each module builds the [`CommandNode`](super::CommandNode)s it owns:
//! options are declared through the binder and the returned keys are
//! captured by the node's action.

pub mod cluster;
pub mod completion;
pub mod list;
pub mod misc;
pub mod prompt;

use super::context::CommandContext;
use super::error::{CliError, CliResult};
use super::node::CommandNode;
use super::state::FsClusterStore;
use crate::cli::binder::declare_string;
use crate::config::{expand_path, OptionKey};

/// Default location of the local state store
pub const DEFAULT_STATE_STORE: &str = "~/.kubicorn/_state";

/// Declare the state store option on `node`
pub(crate) fn declare_state_store(node: &mut CommandNode) -> CliResult<OptionKey<String>> {
    declare_string(
        node,
        "state-store-path",
        Some('S'),
        DEFAULT_STATE_STORE,
        "Path to the local state store",
    )
}

/// Open the state store the resolved options point at
pub(crate) fn open_state_store(
    ctx: &mut CommandContext<'_>,
    key: &OptionKey<String>,
) -> CliResult<FsClusterStore> {
    let path = ctx.config()?.get(key)?;
    if path.is_empty() {
        return Err(CliError::InvalidInput("state-store-path must not be empty".to_string()));
    }
    Ok(FsClusterStore::new(expand_path(&path)))
}
