//! Argument dispatch.
//!
//! The dispatcher parses a command line against the registry's tree, builds
//! the flag layer from the matches, makes sure configuration is loaded for
//! commands that need it and runs the matched node's action. Nodes without
//! an action print their help.

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches};
use std::cell::{OnceCell, RefCell};
use std::ffi::OsString;
use std::io::Write;

use super::binder::CONFIG_ARG;
use super::context::{select_writer, CommandContext, Streams};
use super::error::{CliError, CliResult};
use super::node::ARGS_ID;
use super::registry::CommandRegistry;
use crate::config::{
    default_config_path, resolve_lenient, ConfigInitializer, ConfigSource, EnvironmentLoader,
    FlagLayer, InitState, OptionDescriptor, OptionKind, OptionValue, YamlFileSource, ENV_PREFIX,
};

/// Parses arguments and runs commands from a finalized registry.
pub struct Dispatcher {
    registry: CommandRegistry,
    env: EnvironmentLoader,
    source: RefCell<Option<Box<dyn ConfigSource>>>,
    init: OnceCell<ConfigInitializer>,
}

impl Dispatcher {
    /// Dispatcher over `registry` reading the process environment
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            env: EnvironmentLoader::new(ENV_PREFIX),
            source: RefCell::new(None),
            init: OnceCell::new(),
        }
    }

    /// Replace the environment snapshot
    pub fn with_env(mut self, env: EnvironmentLoader) -> Self {
        self.env = env;
        self
    }

    /// Read configuration from `source` instead of the `--config`/`KUBICORN_CONFIG`/default path
    pub fn with_source(self, source: impl ConfigSource + 'static) -> Self {
        *self.source.borrow_mut() = Some(Box::new(source));
        self
    }

    /// The command tree
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Environment snapshot
    pub fn env(&self) -> &EnvironmentLoader {
        &self.env
    }

    /// Whether the config file has been read, and how that went
    pub fn config_state(&self) -> InitState {
        self.init
            .get()
            .map(ConfigInitializer::state)
            .unwrap_or(InitState::Uninitialized)
    }

    /// The configuration hook, created on first use.
    ///
    /// The source is fixed by the first caller; later `--config` values
    /// within the same process are ignored.
    pub(crate) fn initializer(&self, config_flag: Option<&str>) -> &ConfigInitializer {
        self.init.get_or_init(|| {
            let source = self
                .source
                .borrow_mut()
                .take()
                .unwrap_or_else(|| -> Box<dyn ConfigSource> {
                    Box::new(YamlFileSource::resolve(config_flag, self.env.config_path()))
                });
            ConfigInitializer::new(source, self.env.clone())
        })
    }

    /// Dispatch the process arguments over the standard streams
    pub fn execute(&self) -> CliResult<()> {
        let mut streams = Streams::stdio();
        self.execute_from(std::env::args_os(), &mut streams)
    }

    /// Dispatch `args` (program name first) over `streams`.
    pub fn execute_from<I, T>(&self, args: I, streams: &mut Streams) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let mut cmd = self.command();
        let matches = match cmd.try_get_matches_from_mut(&args) {
            Ok(matches) => matches,
            Err(err) => return self.handle_parse_error(err, &args, streams),
        };

        let mut path = Vec::new();
        let mut chain = vec![&matches];
        let mut current = &matches;
        while let Some((name, sub)) = current.subcommand() {
            path.push(name.to_string());
            chain.push(sub);
            current = sub;
        }

        let node = self
            .registry
            .find(&path)
            .ok_or_else(|| CliError::NotFound(path.join(" ")))?;
        let descriptors = self.registry.visible_options(&path);
        let flags = flag_layer(&descriptors, &chain);
        let config_flag = chain
            .iter()
            .rev()
            .find_map(|m| m.try_get_one::<String>(CONFIG_ARG).ok().flatten().cloned());
        let args = positional_args(current);

        let mut ctx =
            CommandContext::new(self, node, path, streams, descriptors, flags, config_flag);
        if node.requires_config() {
            ctx.config()?;
        }
        ctx.log_debug(&format!("Dispatching [{}]", ctx.command_path()));

        match node.action() {
            Some(action) => action.run(&mut ctx, &args),
            None => ctx.render_help(),
        }
    }

    /// Help text of the node at `path`
    pub fn help_for(&self, path: &[String]) -> CliResult<String> {
        let mut cmd = self.command();
        cmd.build();

        let mut current = &mut cmd;
        for name in path {
            current = current
                .find_subcommand_mut(name)
                .ok_or_else(|| CliError::NotFound(name.clone()))?;
        }
        Ok(current.render_long_help().to_string())
    }

    /// The clap command for the whole tree plus the `--config` flag
    pub fn command(&self) -> clap::Command {
        self.registry.root().to_clap().arg(
            Arg::new(CONFIG_ARG)
                .long(CONFIG_ARG)
                .value_name("FILE")
                .global(true)
                .help(format!("Config file [default: {}]", default_config_path().display())),
        )
    }

    fn handle_parse_error(
        &self,
        err: clap::Error,
        args: &[OsString],
        streams: &mut Streams,
    ) -> CliResult<()> {
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let root_options = self.registry.visible_options::<&str>(&[]);
                let flags = scan_flags(&root_options, args);
                let (store, _) = resolve_lenient(&root_options, None, &self.env, &flags);
                let writer = select_writer(&store, &self.env);

                let mut out = writer.wrap(&mut *streams.out);
                write!(out, "{}", err.render())?;
                out.flush()?;
                Ok(())
            }
            _ => Err(CliError::Usage(err.render().to_string().trim_end().to_string())),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.registry.root().name())
            .field("config_state", &self.config_state())
            .finish()
    }
}

/// Flag values given on the command line for the visible options.
///
/// Persistent options may be given at any level of the command path; the
/// deepest occurrence wins.
fn flag_layer(descriptors: &[OptionDescriptor], chain: &[&ArgMatches]) -> FlagLayer {
    let mut flags = FlagLayer::new();
    for desc in descriptors {
        if let Some(value) = chain.iter().rev().find_map(|m| flag_value(m, desc)) {
            flags.set(desc.name.clone(), value);
        }
    }
    flags
}

/// Persistent flag values read straight from `args`.
///
/// Used when clap stops before producing matches. Unparsable values are
/// skipped and scanning stops at `--`.
fn scan_flags(descriptors: &[OptionDescriptor], args: &[OsString]) -> FlagLayer {
    let mut flags = FlagLayer::new();
    let mut words = args.iter().skip(1).filter_map(|a| a.to_str());

    while let Some(word) = words.next() {
        if word == "--" {
            break;
        }

        let (desc, inline) = if let Some(long) = word.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (long, None),
            };
            match descriptors.iter().find(|d| d.name == name) {
                Some(desc) => (desc, inline),
                None => continue,
            }
        } else if let Some(short) = word.strip_prefix('-') {
            let mut chars = short.chars();
            let Some(flag) = chars.next() else { continue };
            let rest = chars.as_str();
            let inline = (!rest.is_empty()).then(|| rest.strip_prefix('=').unwrap_or(rest));
            match descriptors.iter().find(|d| d.shorthand == Some(flag)) {
                Some(desc) => (desc, inline),
                None => continue,
            }
        } else {
            continue;
        };

        let kind = desc.kind();
        let raw = match (inline, kind) {
            (Some(value), _) => Some(value),
            (None, OptionKind::Bool) => Some("true"),
            (None, _) => words.next(),
        };
        if let Some(value) = raw.and_then(|r| OptionValue::parse(kind, r)) {
            flags.set(desc.name.clone(), value);
        }
    }

    flags
}

fn flag_value(matches: &ArgMatches, desc: &OptionDescriptor) -> Option<OptionValue> {
    let id = desc.name.as_str();
    match desc.kind() {
        OptionKind::Int => matches
            .try_get_one::<i64>(id)
            .ok()
            .flatten()
            .map(|v| OptionValue::Int(*v)),
        OptionKind::Bool => matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .map(|v| OptionValue::Bool(*v)),
        OptionKind::Str => matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(|v| OptionValue::Str(v.clone())),
    }
}

fn positional_args(matches: &ArgMatches) -> Vec<String> {
    matches
        .try_get_many::<String>(ARGS_ID)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::binder::declare_string;
    use crate::cli::node::CommandNode;
    use crate::cli::test_utils::{shared_streams, MemorySource};
    use crate::config::{persistent_options, FABULOUS, VERBOSE};
    use std::cell::Cell;
    use std::rc::Rc;

    fn recording_registry(seen: Rc<RefCell<Vec<String>>>) -> CommandRegistry {
        let mut root = CommandNode::new("kubicorn", "Kubernetes cluster management, without any magic");
        for desc in persistent_options() {
            crate::cli::binder::declare(&mut root, desc).unwrap();
        }
        let mut registry = CommandRegistry::with_root(root);

        let mut apply = CommandNode::new("apply", "Apply a cluster").needs_config(true);
        let name = declare_string(&mut apply, "name", Some('n'), "", "Cluster name").unwrap();
        let record = Rc::clone(&seen);
        let apply = apply.with_action_fn(move |ctx, args| {
            let store = ctx.config()?;
            record.borrow_mut().push(format!(
                "apply args={:?} name={} verbose={} fab={}",
                args,
                store.get(&name)?,
                store.get(&VERBOSE)?,
                store.get(&FABULOUS)?
            ));
            Ok(())
        });
        registry.register(apply).unwrap();

        let record = Rc::clone(&seen);
        let version = CommandNode::new("version", "Show version").with_action_fn(move |ctx, _| {
            record
                .borrow_mut()
                .push(format!("version loaded={}", ctx.config_loaded()));
            Ok(())
        });
        registry.register(version).unwrap();

        registry.finalize().unwrap();
        registry
    }

    fn dispatcher(
        yaml: Option<&'static str>,
        vars: Vec<(&str, &str)>,
    ) -> (Dispatcher, Rc<RefCell<Vec<String>>>, Rc<Cell<usize>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (source, loads) = MemorySource::new(yaml);
        let dispatcher = Dispatcher::new(recording_registry(Rc::clone(&seen)))
            .with_env(EnvironmentLoader::from_vars("KUBICORN", vars))
            .with_source(source);
        (dispatcher, seen, loads)
    }

    #[test]
    fn test_dispatch_runs_matched_action_with_args() {
        let (dispatcher, seen, loads) = dispatcher(Some("verbose: 5\n"), vec![]);
        let (mut streams, _, _) = shared_streams("");

        dispatcher
            .execute_from(["kubicorn", "apply", "mycluster", "-v", "7"], &mut streams)
            .unwrap();

        assert_eq!(
            seen.borrow().as_slice(),
            ["apply args=[\"mycluster\"] name= verbose=7 fab=false"]
        );
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_unknown_command_runs_nothing() {
        let (dispatcher, seen, loads) = dispatcher(Some(""), vec![]);
        let (mut streams, out, _) = shared_streams("");

        let err = dispatcher
            .execute_from(["kubicorn", "bogus"], &mut streams)
            .unwrap_err();

        assert!(matches!(err, CliError::Usage(ref msg) if msg.contains("bogus")));
        assert!(seen.borrow().is_empty());
        assert!(out.contents().is_empty());
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn test_bare_root_prints_help() {
        let (dispatcher, seen, loads) = dispatcher(None, vec![]);
        let (mut streams, out, _) = shared_streams("");

        dispatcher.execute_from(["kubicorn"], &mut streams).unwrap();

        let help = out.contents();
        assert!(help.contains("Kubernetes cluster management, without any magic"));
        assert!(help.contains("apply"));
        assert!(help.contains("--verbose"));
        assert!(seen.borrow().is_empty());
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn test_help_flag_succeeds() {
        let (dispatcher, _, _) = dispatcher(None, vec![]);
        let (mut streams, out, _) = shared_streams("");

        dispatcher.execute_from(["kubicorn", "apply", "--help"], &mut streams).unwrap();
        assert!(out.contents().contains("--name"));
    }

    #[test]
    fn test_config_is_read_at_most_once() {
        let (dispatcher, seen, loads) = dispatcher(Some("verbose: 5\nfab: true\n"), vec![]);
        let (mut streams, _, _) = shared_streams("");

        for _ in 0..3 {
            dispatcher.execute_from(["kubicorn", "apply"], &mut streams).unwrap();
        }

        assert_eq!(loads.get(), 1);
        assert_eq!(seen.borrow().len(), 3);
        assert!(seen.borrow()[2].ends_with("verbose=5 fab=true"));
        assert_eq!(dispatcher.config_state(), InitState::Initialized);
    }

    #[test]
    fn test_missing_config_only_fails_commands_that_need_it() {
        let (dispatcher, seen, loads) = dispatcher(None, vec![]);
        let (mut streams, _, _) = shared_streams("");

        dispatcher.execute_from(["kubicorn", "version"], &mut streams).unwrap();
        assert_eq!(seen.borrow().as_slice(), ["version loaded=false"]);
        assert_eq!(loads.get(), 0);

        let err = dispatcher.execute_from(["kubicorn", "apply"], &mut streams).unwrap_err();
        assert!(matches!(err, CliError::ConfigUnavailable(_)));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(dispatcher.config_state(), InitState::Failed);
    }

    #[test]
    fn test_env_overrides_file_and_flag_overrides_env() {
        let (dispatcher, seen, _) = dispatcher(Some("verbose: 5\n"), vec![("KUBICORN_VERBOSE", "7")]);
        let (mut streams, _, _) = shared_streams("");

        dispatcher.execute_from(["kubicorn", "apply"], &mut streams).unwrap();
        dispatcher.execute_from(["kubicorn", "-v", "9", "apply"], &mut streams).unwrap();

        let seen = seen.borrow();
        assert!(seen[0].contains("verbose=7"));
        assert!(seen[1].contains("verbose=9"));
    }

    #[test]
    fn test_invalid_env_value_falls_back_to_default_with_warning() {
        let (dispatcher, seen, loads) = dispatcher(Some(""), vec![("KUBICORN_VERBOSE", "loud")]);
        let (mut streams, _, err) = shared_streams("");

        dispatcher.execute_from(["kubicorn", "version"], &mut streams).unwrap();
        assert_eq!(seen.borrow().as_slice(), ["version loaded=false"]);
        assert_eq!(loads.get(), 0);
        assert!(err.contents().contains("option 'verbose'"));
        assert!(err.contents().contains("using the default"));
    }

    #[test]
    fn test_invalid_env_value_does_not_break_help() {
        let (dispatcher, _, _) = dispatcher(None, vec![("KUBICORN_FAB", "maybe")]);
        let (mut streams, out, _) = shared_streams("");

        dispatcher.execute_from(["kubicorn", "--help"], &mut streams).unwrap();
        dispatcher.execute_from(["kubicorn"], &mut streams).unwrap();
        assert!(out.contents().contains("--verbose"));
        assert!(!out.contents().contains('\x1b'));
    }

    #[test]
    fn test_invalid_env_value_fails_commands_that_need_config() {
        let (dispatcher, seen, _) = dispatcher(Some(""), vec![("KUBICORN_VERBOSE", "loud")]);
        let (mut streams, _, _) = shared_streams("");

        let err = dispatcher.execute_from(["kubicorn", "apply"], &mut streams).unwrap_err();
        assert!(matches!(
            err,
            CliError::ConfigUnavailable(ref cause) if cause.reason.contains("verbose")
        ));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_help_flag_honors_fab_flag() {
        for args in [
            ["kubicorn", "--fab", "--help"],
            ["kubicorn", "-f", "--help"],
            ["kubicorn", "--help", "--fab=true"],
        ] {
            let (dispatcher, _, _) = dispatcher(None, vec![]);
            let (mut streams, out, _) = shared_streams("");

            dispatcher.execute_from(args, &mut streams).unwrap();
            assert!(out.contents().contains("\x1b["), "no colors for {:?}", args);
        }

        let (dispatcher, _, _) = dispatcher(None, vec![]);
        let (mut streams, out, _) = shared_streams("");
        dispatcher.execute_from(["kubicorn", "--fab=false", "--help"], &mut streams).unwrap();
        assert!(!out.contents().contains("\x1b["));
    }

    #[test]
    fn test_scan_flags_reads_persistent_options_from_argv() {
        let args: Vec<OsString> = ["kubicorn", "-v", "7", "--color=false", "apply", "-f"]
            .iter()
            .map(OsString::from)
            .collect();
        let flags = scan_flags(&persistent_options(), &args);
        assert_eq!(flags.get("verbose"), Some(&OptionValue::Int(7)));
        assert_eq!(flags.get("color"), Some(&OptionValue::Bool(false)));
        assert_eq!(flags.get("fab"), Some(&OptionValue::Bool(true)));

        let args: Vec<OsString> = ["kubicorn", "--verbose=loud", "-v9", "--", "--fab"]
            .iter()
            .map(OsString::from)
            .collect();
        let flags = scan_flags(&persistent_options(), &args);
        assert_eq!(flags.get("verbose"), Some(&OptionValue::Int(9)));
        assert_eq!(flags.get("fab"), None);
    }
}
