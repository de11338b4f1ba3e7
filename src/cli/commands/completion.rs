//! `kubicorn completion <shell>`

use clap_complete::Shell;
use std::str::FromStr;

use crate::cli::completion::generate_script;
use crate::cli::error::CliError;
use crate::cli::node::CommandNode;
use crate::cli::profiles;

const LONG: &str = "Generate a completion script for the given shell.

To load completions in the current bash session:

    source <(kubicorn completion bash)

Supported shells: bash, zsh, fish, elvish, powershell.";

/// Build the completion command
pub fn command() -> CommandNode {
    CommandNode::new("completion", "Generate completion code for bash and zsh shells.")
        .with_long(LONG)
        .with_args_name("SHELL")
        .with_action_fn(|ctx, args| {
            let shell = match args {
                [name] => Shell::from_str(name)
                    .map_err(|_| CliError::InvalidInput(format!("unsupported shell '{}'", name)))?,
                [] => return Err(CliError::InvalidInput("please specify a shell".to_string())),
                _ => return Err(CliError::InvalidInput("too many arguments".to_string())),
            };

            let mut cmd = ctx.clap_command();
            let root = ctx.registry().root();
            let script = generate_script(shell, &mut cmd, root, &profiles::spellings());
            ctx.out().write_all(script.as_bytes())?;
            Ok(())
        })
}
