//! `kubicorn list`

use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};

use super::{declare_state_store, open_state_store};
use crate::cli::binder::declare_bool;
use crate::cli::error::CliResult;
use crate::cli::node::CommandNode;
use crate::cli::state::ClusterStore;

/// List the clusters in the state store.
///
/// `--no-headers` prints bare names, one per line; shell completion relies on it.
pub fn command() -> CliResult<CommandNode> {
    let mut node = CommandNode::new("list", "List available states")
        .with_long("List the clusters recorded in the state store.")
        .needs_config(true);
    let state_store = declare_state_store(&mut node)?;
    let no_headers = declare_bool(&mut node, "no-headers", None, false, "Print names only")?;

    Ok(node.with_action_fn(move |ctx, _| {
        let store = open_state_store(ctx, &state_store)?;
        let bare = ctx.config()?.get(&no_headers)?;
        let names = store.list()?;

        if bare {
            let out = ctx.out();
            for name in &names {
                writeln!(out, "{}", name)?;
            }
            return Ok(());
        }

        if names.is_empty() {
            ctx.log_info(&format!("No clusters found in {}", store.root().display()));
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(["NAME", "PROFILE", "CLOUD", "STATE", "UPDATED"]);
        for name in &names {
            let record = store.get(name)?;
            table.add_row([
                record.name,
                record.profile,
                record.cloud,
                record.state.to_string(),
                record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        writeln!(ctx.out(), "{}", table)?;
        Ok(())
    }))
}
