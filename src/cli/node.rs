//! Command tree nodes.
//!
//! A [`CommandNode`] is one addressable unit of the CLI: its help text, the
//! options it declares, its children and, optionally, the action that runs
//! when it is invoked. Nodes are turned into a clap [`Command`] on every
//! dispatch, so the tree stays the single source of truth.

use clap::{Arg, ArgAction, Command};
use std::collections::BTreeMap;
use std::fmt;

use super::binder::build_arg;
use super::context::CommandContext;
use super::error::{CliError, CliResult};
use crate::config::OptionDescriptor;

/// Clap id of the positional arguments collected for runnable leaf commands
pub const ARGS_ID: &str = "args";

/// One line of the command listing handed to actions at finalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    /// Space separated path below the root, e.g. `get-config`
    pub path: String,
    /// Short help text
    pub short: String,
}

/// Behavior attached to a command.
pub trait Runnable {
    /// Run the command with its remaining positional arguments.
    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> CliResult<()>;

    /// Called once the whole tree is registered.
    fn finalize(&mut self, _commands: &[CommandSummary]) {}
}

struct FnAction<F>(F);

impl<F> Runnable for FnAction<F>
where
    F: Fn(&mut CommandContext<'_>, &[String]) -> CliResult<()>,
{
    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> CliResult<()> {
        (self.0)(ctx, args)
    }
}

/// A named, invocable unit of the command tree.
pub struct CommandNode {
    name: String,
    short: String,
    long: Option<String>,
    args_name: Option<String>,
    action: Option<Box<dyn Runnable>>,
    children: Vec<CommandNode>,
    options: Vec<OptionDescriptor>,
    annotations: BTreeMap<String, Vec<String>>,
    needs_config: bool,
}

impl CommandNode {
    /// New node without action, options or children
    pub fn new(name: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: short.into(),
            long: None,
            args_name: None,
            action: None,
            children: Vec::new(),
            options: Vec::new(),
            annotations: BTreeMap::new(),
            needs_config: false,
        }
    }

    /// Long help text shown by `--help`
    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    /// Value name shown for the positional arguments in usage
    pub fn with_args_name(mut self, name: impl Into<String>) -> Self {
        self.args_name = Some(name.into());
        self
    }

    /// Attach a run action
    pub fn with_action(mut self, action: impl Runnable + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Attach a closure as the run action
    pub fn with_action_fn<F>(self, action: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>, &[String]) -> CliResult<()> + 'static,
    {
        self.with_action(FnAction(action))
    }

    /// Mark whether the configuration file must be loaded before the action runs
    pub fn needs_config(mut self, needs_config: bool) -> Self {
        self.needs_config = needs_config;
        self
    }

    /// Add a child command; sibling names must be unique.
    pub fn add_child(&mut self, child: CommandNode) -> CliResult<()> {
        if self.child(&child.name).is_some() {
            return Err(CliError::DuplicateCommand(child.name));
        }
        self.children.push(child);
        Ok(())
    }

    /// Command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short help text
    pub fn short(&self) -> &str {
        &self.short
    }

    /// Child commands in registration order
    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    /// Child by name
    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable child by name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut CommandNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Options declared on this node
    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    /// Option declared on this node by name
    pub fn option(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.name == name)
    }

    pub(crate) fn push_option(&mut self, descriptor: OptionDescriptor) {
        self.options.push(descriptor);
    }

    /// Completion hints attached to `flag`, in attachment order
    pub fn annotations(&self, flag: &str) -> &[String] {
        self.annotations.get(flag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All completion hints keyed by option name
    pub fn all_annotations(&self) -> &BTreeMap<String, Vec<String>> {
        &self.annotations
    }

    pub(crate) fn push_annotation(&mut self, flag: &str, hint: &str) {
        self.annotations
            .entry(flag.to_string())
            .or_default()
            .push(hint.to_string());
    }

    /// Whether the node has a run action
    pub fn is_runnable(&self) -> bool {
        self.action.is_some()
    }

    /// Whether configuration must be loaded before the action runs
    pub fn requires_config(&self) -> bool {
        self.needs_config
    }

    pub(crate) fn action(&self) -> Option<&dyn Runnable> {
        self.action.as_deref()
    }

    pub(crate) fn finalize_actions(&mut self, commands: &[CommandSummary]) {
        if let Some(action) = self.action.as_mut() {
            action.finalize(commands);
        }
        for child in &mut self.children {
            child.finalize_actions(commands);
        }
    }

    /// Build the clap command for this node and everything below it.
    pub fn to_clap(&self) -> Command {
        let mut cmd = Command::new(self.name.clone()).about(self.short.clone());

        if let Some(long) = &self.long {
            cmd = cmd.long_about(long.clone());
        }

        for desc in &self.options {
            cmd = cmd.arg(build_arg(desc));
        }

        // Only leaves take positionals; parents report unknown subcommands instead.
        if self.action.is_some() && self.children.is_empty() {
            let value_name = self.args_name.clone().unwrap_or_else(|| "ARGS".to_string());
            cmd = cmd.arg(
                Arg::new(ARGS_ID)
                    .value_name(value_name)
                    .num_args(0..)
                    .action(ArgAction::Append),
            );
        }

        for child in &self.children {
            cmd = cmd.subcommand(child.to_clap());
        }

        cmd
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("runnable", &self.is_runnable())
            .field("needs_config", &self.needs_config)
            .field("options", &self.options)
            .field("annotations", &self.annotations)
            .field("children", &self.children)
            .finish()
    }
}
