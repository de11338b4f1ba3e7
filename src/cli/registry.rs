//! Command registry.
//!
//! Owns the command tree. Building it is two-phase: commands are registered
//! in any order, then [`CommandRegistry::finalize`] validates option
//! visibility and hands every action the complete command listing.

use super::binder::declare;
use super::commands;
use super::completion::{annotate, AnnotateOutcome};
use super::error::{CliError, CliResult};
use super::node::{CommandNode, CommandSummary};
use crate::config::{persistent_options, OptionDescriptor};

const ROOT_SHORT: &str = "Kubernetes cluster management, without any magic";

const ROOT_LONG: &str = "Kubernetes cluster management, without any magic

kubicorn creates and manages Kubernetes clusters from declarative cluster
profiles kept in a local state store. Every command accepts the persistent
options below; values are taken from flags, then KUBICORN_* environment
variables, then ~/.kubicorn/kubicorn.cfg, then the built-in defaults.";

/// The root command and everything registered under it.
#[derive(Debug)]
pub struct CommandRegistry {
    root: CommandNode,
    finalized: bool,
}

impl CommandRegistry {
    /// The kubicorn command tree, finalized and ready to dispatch
    pub fn new() -> CliResult<Self> {
        let mut root = CommandNode::new("kubicorn", ROOT_SHORT).with_long(ROOT_LONG);
        for desc in persistent_options() {
            declare(&mut root, desc)?;
        }

        let mut registry = Self::with_root(root);
        registry.register(commands::cluster::adopt()?)?;
        registry.register(commands::cluster::apply()?)?;
        registry.register(commands::completion::command())?;
        registry.register(commands::cluster::create()?)?;
        registry.register(commands::cluster::delete()?)?;
        registry.register(commands::cluster::edit()?)?;
        registry.register(commands::cluster::get_config()?)?;
        registry.register(commands::misc::image())?;
        registry.register(commands::list::command()?)?;
        registry.register(commands::misc::version())?;
        registry.register(commands::prompt::command())?;
        registry.finalize()?;

        Ok(registry)
    }

    /// Registry over a custom root, not yet finalized
    pub fn with_root(root: CommandNode) -> Self {
        Self {
            root,
            finalized: false,
        }
    }

    /// Add a top-level command.
    pub fn register(&mut self, node: CommandNode) -> CliResult<()> {
        if self.finalized {
            return Err(CliError::ValidationError(format!(
                "cannot register '{}' after the registry is finalized",
                node.name()
            )));
        }
        self.root.add_child(node)
    }

    /// Validate the tree and let actions see the full command listing.
    ///
    /// An option may not reuse the name or shorthand of a persistent option
    /// declared by one of its ancestors.
    pub fn finalize(&mut self) -> CliResult<()> {
        if self.finalized {
            return Ok(());
        }

        check_shadowing(&self.root, &[])?;

        let mut summaries = Vec::new();
        collect_summaries(&self.root, "", &mut summaries);
        self.root.finalize_actions(&summaries);

        self.finalized = true;
        Ok(())
    }

    /// Whether [`finalize`](Self::finalize) has run
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Root node
    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    /// Node at `path` below the root; the empty path is the root itself
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(&self.root, |node, name| node.child(name.as_ref()))
    }

    fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut CommandNode> {
        path.iter()
            .try_fold(&mut self.root, |node, name| node.child_mut(name.as_ref()))
    }

    /// Attach a completion hint to an option of the node at `path`.
    ///
    /// Allowed after finalization, before dispatch.
    pub fn annotate<S: AsRef<str>>(
        &mut self,
        path: &[S],
        flag: &str,
        hint: &str,
    ) -> CliResult<AnnotateOutcome> {
        let node = self.find_mut(path).ok_or_else(|| {
            CliError::NotFound(
                path.iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        })?;
        Ok(annotate(node, flag, hint))
    }

    /// Options visible to the node at `path`: persistent options of its
    /// ancestors followed by its own.
    pub fn visible_options<S: AsRef<str>>(&self, path: &[S]) -> Vec<OptionDescriptor> {
        let mut visible = Vec::new();
        let mut node = &self.root;

        for name in path {
            visible.extend(node.options().iter().filter(|o| o.persistent).cloned());
            match node.child(name.as_ref()) {
                Some(child) => node = child,
                None => return visible,
            }
        }

        visible.extend(node.options().iter().cloned());
        visible
    }

    /// Every command below the root, depth first
    pub fn summaries(&self) -> Vec<CommandSummary> {
        let mut summaries = Vec::new();
        collect_summaries(&self.root, "", &mut summaries);
        summaries
    }
}

fn check_shadowing(node: &CommandNode, inherited: &[&OptionDescriptor]) -> CliResult<()> {
    for desc in node.options() {
        let clash = inherited.iter().find(|parent| {
            parent.name == desc.name
                || (desc.shorthand.is_some() && parent.shorthand == desc.shorthand)
        });
        if let Some(parent) = clash {
            return Err(CliError::duplicate_option(node.name(), &parent.name));
        }
    }

    let mut visible = inherited.to_vec();
    visible.extend(node.options().iter().filter(|o| o.persistent));
    for child in node.children() {
        check_shadowing(child, &visible)?;
    }
    Ok(())
}

fn collect_summaries(node: &CommandNode, prefix: &str, out: &mut Vec<CommandSummary>) {
    for child in node.children() {
        let path = if prefix.is_empty() {
            child.name().to_string()
        } else {
            format!("{} {}", prefix, child.name())
        };
        out.push(CommandSummary {
            path: path.clone(),
            short: child.short().to_string(),
        });
        collect_summaries(child, &path, out);
    }
}
