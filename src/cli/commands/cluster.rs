//! Cluster lifecycle commands backed by the local state store.
//!
//! - create: declare a cluster from a profile
//! - adopt: take existing infrastructure under management
//! - apply: mark a declared cluster as applied
//! - delete: mark a cluster deleted, or purge its record
//! - edit: open the cluster document in an editor
//! - get-config: print the stored cluster document

use std::process::Command;

use super::{declare_state_store, open_state_store};
use crate::cli::binder::{declare_bool, declare_string};
use crate::cli::completion::{annotate, PARSE_LIST, PARSE_PROFILES};
use crate::cli::context::CommandContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::node::CommandNode;
use crate::cli::profiles::{self, Profile};
use crate::cli::state::{ClusterRecord, ClusterState, ClusterStore, FsClusterStore};
use crate::config::OptionKey;

/// Options every cluster command declares
#[derive(Debug, Clone, Copy)]
struct ClusterKeys {
    name: OptionKey<String>,
    state_store: OptionKey<String>,
}

impl ClusterKeys {
    /// Cluster name (positional argument, else `--name`) and the store it lives in
    fn target(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &[String],
    ) -> CliResult<(String, FsClusterStore)> {
        let name = match args {
            [] => ctx.config()?.get(&self.name)?,
            [name] => name.clone(),
            _ => return Err(CliError::InvalidInput("too many arguments".to_string())),
        };
        if name.is_empty() {
            return Err(CliError::InvalidInput(
                "a cluster name is required, as an argument or with --name".to_string(),
            ));
        }

        let store = open_state_store(ctx, &self.state_store)?;
        Ok((name, store))
    }
}

fn cluster_node(name: &str, short: &str, long: &str) -> CliResult<(CommandNode, ClusterKeys)> {
    let mut node = CommandNode::new(name, short)
        .with_long(long)
        .with_args_name("NAME")
        .needs_config(true);

    let keys = ClusterKeys {
        name: declare_string(&mut node, "name", Some('n'), "", "Cluster name")?,
        state_store: declare_state_store(&mut node)?,
    };
    Ok((node, keys))
}

fn require_existing(store: &FsClusterStore, name: &str) -> CliResult<ClusterRecord> {
    if !store.exists(name) {
        return Err(CliError::NotFound(format!("cluster '{}'", name)));
    }
    Ok(store.get(name)?)
}

fn lookup_profile(name: &str) -> CliResult<&'static Profile> {
    profiles::lookup(name).ok_or_else(|| {
        CliError::InvalidInput(format!(
            "unknown profile '{}', expected one of: {}",
            name,
            profiles::spellings().join(", ")
        ))
    })
}

/// `kubicorn create`
pub fn create() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "create",
        "Create a Kubernetes cluster",
        "Create a Kubernetes cluster from a profile. The cluster is recorded in the \
         state store and can be applied later.",
    )?;
    let profile_key = declare_string(&mut node, "profile", Some('p'), "aws", "Cluster profile")?;
    annotate(&mut node, "profile", PARSE_PROFILES);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        let profile = lookup_profile(&ctx.config()?.get(&profile_key)?)?;

        if store.exists(&name) {
            return Err(CliError::ValidationError(format!("cluster '{}' already exists", name)));
        }

        store.commit(&ClusterRecord::from_profile(&name, profile, ClusterState::Created))?;
        ctx.log_success(&format!("Created cluster [{}] with profile [{}]", name, profile.name));
        ctx.log_debug(&format!("State written to {}", store.document_path(&name).display()));
        Ok(())
    }))
}

/// `kubicorn adopt`
pub fn adopt() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "adopt",
        "Adopt a Kubernetes cluster into a kubicorn state store",
        "Record existing infrastructure as a cluster so kubicorn can manage it.",
    )?;
    let profile_key = declare_string(&mut node, "profile", Some('p'), "aws", "Cluster profile")?;
    annotate(&mut node, "profile", PARSE_PROFILES);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        let profile = lookup_profile(&ctx.config()?.get(&profile_key)?)?;

        if store.exists(&name) {
            return Err(CliError::ValidationError(format!(
                "cluster '{}' is already managed",
                name
            )));
        }

        store.commit(&ClusterRecord::from_profile(&name, profile, ClusterState::Adopted))?;
        ctx.log_success(&format!("Adopted cluster [{}] on [{}]", name, profile.cloud));
        Ok(())
    }))
}

/// `kubicorn apply`
pub fn apply() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "apply",
        "Apply a cluster resource to a cloud",
        "Reconcile the cluster described in the state store with the cloud.",
    )?;
    annotate(&mut node, "name", PARSE_LIST);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        let mut record = require_existing(&store, &name)?;

        if record.state == ClusterState::Deleted {
            return Err(CliError::ValidationError(format!(
                "cluster '{}' was deleted, create it again first",
                name
            )));
        }

        ctx.log_info(&format!("Applying cluster [{}] on [{}]", name, record.cloud));
        record.transition(ClusterState::Applied);
        store.commit(&record)?;
        ctx.log_success(&format!("Applied cluster [{}]", name));
        Ok(())
    }))
}

/// `kubicorn delete`
pub fn delete() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "delete",
        "Delete a Kubernetes cluster",
        "Tear down a cluster. The record stays in the state store unless --purge is given.",
    )?;
    let purge_key =
        declare_bool(&mut node, "purge", None, false, "Remove the cluster from the state store")?;
    annotate(&mut node, "name", PARSE_LIST);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        let purge = ctx.config()?.get(&purge_key)?;
        let mut record = require_existing(&store, &name)?;

        if purge {
            store.destroy(&name)?;
            ctx.log_success(&format!("Purged cluster [{}] from the state store", name));
            return Ok(());
        }

        if record.state == ClusterState::Deleted {
            ctx.log_warn(&format!("Cluster [{}] is already deleted", name));
            return Ok(());
        }

        record.transition(ClusterState::Deleted);
        store.commit(&record)?;
        ctx.log_success(&format!("Deleted cluster [{}]", name));
        Ok(())
    }))
}

/// `kubicorn edit`
pub fn edit() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "edit",
        "Edit a cluster state",
        "Open the stored cluster document in an editor. The editor comes from \
         --editor, then $EDITOR, then vi.",
    )?;
    let editor_key =
        declare_string(&mut node, "editor", Some('e'), "", "Editor used to edit the state")?;
    annotate(&mut node, "name", PARSE_LIST);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        require_existing(&store, &name)?;

        let editor = match ctx.config()?.get(&editor_key)? {
            editor if !editor.is_empty() => editor,
            _ => std::env::var("EDITOR")
                .ok()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "vi".to_string()),
        };

        let mut words = editor.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| CliError::InvalidInput("editor must not be blank".to_string()))?;
        let path = store.document_path(&name);

        ctx.log_debug(&format!("Opening {} with {}", path.display(), program));
        let status = Command::new(program).args(words).arg(&path).status()?;
        if !status.success() {
            return Err(CliError::ExecutionError(format!(
                "editor '{}' exited with {}",
                program, status
            )));
        }

        // Reject edits that no longer parse as a cluster document.
        store.get(&name)?;
        ctx.log_success(&format!("Updated cluster [{}]", name));
        Ok(())
    }))
}

/// `kubicorn get-config`
pub fn get_config() -> CliResult<CommandNode> {
    let (mut node, keys) = cluster_node(
        "get-config",
        "Print the stored configuration of a cluster",
        "Print the cluster document kept in the state store.",
    )?;
    annotate(&mut node, "name", PARSE_LIST);

    Ok(node.with_action_fn(move |ctx, args| {
        let (name, store) = keys.target(ctx, args)?;
        require_existing(&store, &name)?;

        let document = store.document(&name)?;
        write!(ctx.out(), "{}", document)?;
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_utils::{dispatch_from, dispatch_with, TestState};
    use crate::config::YamlFileSource;

    #[test]
    fn test_create_then_get_config() {
        let state = TestState::new();
        state.run(&["create", "alpha", "--profile", "do"]).unwrap();

        let out = state.run(&["get-config", "alpha"]).unwrap();
        assert!(out.contains("name: alpha"));
        assert!(out.contains("cloud: digitalocean"));
        assert!(out.contains("state: created"));
    }

    #[test]
    fn test_name_from_flag() {
        let state = TestState::new();
        state.run(&["create", "--name", "beta", "-p", "gce"]).unwrap();
        assert!(state.store().exists("beta"));
    }

    #[test]
    fn test_name_is_required() {
        let state = TestState::new();
        let err = state.run(&["create"]).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }

    #[test]
    fn test_too_many_arguments() {
        let state = TestState::new();
        let err = state.run(&["apply", "one", "two"]).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(ref msg) if msg.contains("too many")));
    }

    #[test]
    fn test_unknown_profile() {
        let state = TestState::new();
        let err = state.run(&["create", "alpha", "-p", "azure"]).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(ref msg) if msg.contains("azure")));
        assert!(!state.store().exists("alpha"));
    }

    #[test]
    fn test_create_twice_fails() {
        let state = TestState::new();
        state.run(&["create", "alpha"]).unwrap();
        assert!(state.run(&["create", "alpha"]).is_err());
    }

    #[test]
    fn test_apply_and_delete_lifecycle() {
        let state = TestState::new();
        state.run(&["create", "alpha"]).unwrap();

        state.run(&["apply", "alpha"]).unwrap();
        assert_eq!(state.store().get("alpha").unwrap().state, ClusterState::Applied);

        state.run(&["delete", "alpha"]).unwrap();
        assert_eq!(state.store().get("alpha").unwrap().state, ClusterState::Deleted);

        assert!(state.run(&["apply", "alpha"]).is_err());

        state.run(&["delete", "alpha", "--purge"]).unwrap();
        assert!(!state.store().exists("alpha"));
    }

    #[test]
    fn test_apply_missing_cluster() {
        let state = TestState::new();
        let err = state.run(&["apply", "ghost"]).unwrap_err();
        assert!(matches!(err, CliError::NotFound(_)));
    }

    #[test]
    fn test_adopt_records_state() {
        let state = TestState::new();
        state.run(&["adopt", "legacy", "-p", "amazon"]).unwrap();
        let record = state.store().get("legacy").unwrap();
        assert_eq!(record.state, ClusterState::Adopted);
        assert_eq!(record.image, "ami-835b4efa");
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_with_noop_editor() {
        let state = TestState::new();
        state.run(&["create", "alpha"]).unwrap();
        state.run(&["edit", "alpha", "--editor", "true"]).unwrap();

        let err = state.run(&["edit", "alpha", "-e", "false"]).unwrap_err();
        assert!(matches!(err, CliError::ExecutionError(_)));
    }

    #[test]
    fn test_profile_from_config_file() {
        let state = TestState::with_config("profile: digitalocean\n");
        state.run(&["create", "alpha"]).unwrap();
        assert_eq!(state.store().get("alpha").unwrap().profile, "digitalocean");
    }

    #[test]
    fn test_missing_named_config_fails_cluster_commands() {
        let (result, _, _) = dispatch_with(None, &["kubicorn", "create", "alpha"]);
        assert!(matches!(result, Err(CliError::ConfigUnavailable(_))));
    }

    #[test]
    fn test_missing_default_config_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("_state");
        let store_arg = store.to_str().unwrap();
        let source = || YamlFileSource::optional(dir.path().join("kubicorn.cfg"));

        let (result, _, _) = dispatch_from(
            source(),
            &["kubicorn", "create", "alpha", "--state-store-path", store_arg],
            "",
        );
        result.unwrap();
        assert!(FsClusterStore::new(&store).exists("alpha"));

        let (result, out, _) = dispatch_from(
            source(),
            &["kubicorn", "list", "--no-headers", "-S", store_arg],
            "",
        );
        result.unwrap();
        assert_eq!(out.contents(), "alpha\n");
    }
}
