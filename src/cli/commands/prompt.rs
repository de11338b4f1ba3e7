//! `kubicorn prompt`: an interactive shell over the command tree.

use std::io::Write;

use crate::cli::context::CommandContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::node::{CommandNode, CommandSummary, Runnable};

const PROMPT: &str = "kubicorn > ";

/// Reads command lines and dispatches them until `exit`, `quit` or end of input.
#[derive(Debug, Default)]
pub struct PromptCommand {
    commands: Vec<CommandSummary>,
}

impl PromptCommand {
    /// Commands offered in the banner
    pub fn commands(&self) -> &[CommandSummary] {
        &self.commands
    }

    fn banner(&self, out: &mut dyn Write) -> CliResult<()> {
        writeln!(out, "Interactive kubicorn shell. Type 'exit' to leave.")?;
        writeln!(out)?;
        let width = self.commands.iter().map(|c| c.path.len()).max().unwrap_or(0);
        for cmd in self.commands.iter().filter(|c| c.path != "prompt") {
            writeln!(out, "  {:<width$}  {}", cmd.path, cmd.short, width = width)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

impl Runnable for PromptCommand {
    fn run(&self, ctx: &mut CommandContext<'_>, _args: &[String]) -> CliResult<()> {
        self.banner(ctx.out())?;
        let program = ctx.registry().root().name().to_string();

        loop {
            write!(ctx.out(), "{}", PROMPT)?;
            ctx.out().flush()?;

            let mut line = String::new();
            if ctx.input().read_line(&mut line)? == 0 {
                writeln!(ctx.out())?;
                break;
            }

            let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            match words.first().map(String::as_str) {
                None => continue,
                Some("exit") | Some("quit") => break,
                Some("prompt") => {
                    ctx.log_warn("Already in the kubicorn prompt");
                    continue;
                }
                Some(_) => {}
            }

            let argv = std::iter::once(program.clone()).chain(words).collect();
            match ctx.redispatch(argv) {
                Ok(()) => {}
                // Usage text already explains itself; keep it out of the log prefix.
                Err(CliError::Usage(usage)) => writeln!(ctx.err(), "{}", usage)?,
                Err(err) => ctx.log_critical(&err.to_string()),
            }
        }

        Ok(())
    }

    fn finalize(&mut self, commands: &[CommandSummary]) {
        self.commands = commands.to_vec();
    }
}

/// Build the prompt command
pub fn command() -> CommandNode {
    CommandNode::new("prompt", "Open a prompt with auto-completion (non-Windows)")
        .with_long(
            "Start an interactive shell. Each line is dispatched as a kubicorn command line.",
        )
        .with_action(PromptCommand::default())
}
