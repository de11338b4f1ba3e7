//! Per-dispatch command context.
//!
//! Actions receive a [`CommandContext`] instead of reaching for globals: it
//! holds the resolved options, the logger built from them and the streams
//! the command writes to.

use std::io::{self, BufRead, BufReader, Write};

use super::dispatcher::Dispatcher;
use super::error::CliResult;
use super::node::CommandNode;
use super::registry::CommandRegistry;
use crate::config::{
    resolve_lenient, ConfigStore, EnvironmentLoader, FlagLayer, OptionDescriptor, COLOR, FABULOUS,
    VERBOSE,
};
use crate::observability::{Level, Logger, OutputWriter};

/// Output, error and input streams of a dispatch
pub struct Streams {
    /// Command output
    pub out: Box<dyn Write>,
    /// Log lines and diagnostics
    pub err: Box<dyn Write>,
    /// Interactive input
    pub input: Box<dyn BufRead>,
}

impl Streams {
    /// Streams over arbitrary writers and reader
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Self { out, err, input }
    }

    /// The process' standard streams
    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            Box::new(BufReader::new(io::stdin())),
        )
    }
}

/// Everything an action gets to see about its invocation.
pub struct CommandContext<'a> {
    dispatcher: &'a Dispatcher,
    node: &'a CommandNode,
    path: Vec<String>,
    streams: &'a mut Streams,
    descriptors: Vec<OptionDescriptor>,
    flags: FlagLayer,
    config_flag: Option<String>,
    baseline: ConfigStore,
    full: Option<ConfigStore>,
    logger: Logger,
}

impl<'a> CommandContext<'a> {
    /// Build the context for `node`.
    ///
    /// The baseline store is resolved from flags, environment and defaults
    /// without touching the config file; [`config`](Self::config) adds the
    /// file on demand. An unusable environment value keeps the option's
    /// default here and is logged as a warning.
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        node: &'a CommandNode,
        path: Vec<String>,
        streams: &'a mut Streams,
        descriptors: Vec<OptionDescriptor>,
        flags: FlagLayer,
        config_flag: Option<String>,
    ) -> Self {
        let (baseline, errors) = resolve_lenient(&descriptors, None, dispatcher.env(), &flags);
        let logger = logger_for(&baseline, dispatcher.env());

        let mut ctx = Self {
            dispatcher,
            node,
            path,
            streams,
            descriptors,
            flags,
            config_flag,
            baseline,
            full: None,
            logger,
        };
        for err in errors {
            ctx.log_warn(&format!("{}, using the default", err));
        }
        ctx
    }

    /// The invoked node
    pub fn node(&self) -> &CommandNode {
        self.node
    }

    /// Full command path including the root, e.g. `kubicorn get-config`
    pub fn command_path(&self) -> String {
        std::iter::once(self.dispatcher.registry().root().name())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The registry being dispatched against
    pub fn registry(&self) -> &CommandRegistry {
        self.dispatcher.registry()
    }

    /// The clap command for the whole tree, as the dispatcher parses it
    pub fn clap_command(&self) -> clap::Command {
        self.dispatcher.command()
    }

    /// Environment snapshot
    pub fn env(&self) -> &EnvironmentLoader {
        self.dispatcher.env()
    }

    /// Output stream
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.streams.out
    }

    /// Error stream
    pub fn err(&mut self) -> &mut dyn Write {
        &mut *self.streams.err
    }

    /// Input stream
    pub fn input(&mut self) -> &mut dyn BufRead {
        &mut *self.streams.input
    }

    /// Options resolved so far: the full store once loaded, the baseline otherwise.
    pub fn options(&self) -> &ConfigStore {
        self.full.as_ref().unwrap_or(&self.baseline)
    }

    /// The full configuration, reading the config file on first use.
    pub fn config(&mut self) -> CliResult<&ConfigStore> {
        let store = match self.full.take() {
            Some(store) => store,
            None => {
                let init = self.dispatcher.initializer(self.config_flag.as_deref());
                let store = init.resolve(&self.descriptors, &self.flags)?;
                self.logger = logger_for(&store, self.dispatcher.env());
                store
            }
        };
        Ok(self.full.insert(store))
    }

    /// Whether the config file has been folded into the options
    pub fn config_loaded(&self) -> bool {
        self.full.is_some()
    }

    /// Logger configured from the resolved options
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Writer help text goes through, re-evaluated on every call
    pub fn writer(&self) -> OutputWriter {
        select_writer(self.options(), self.dispatcher.env())
    }

    /// Log a line on the error stream.
    ///
    /// Logging never fails a command; write errors are dropped.
    pub fn log(&mut self, level: Level, message: &str) {
        let _ = self.logger.log(&mut *self.streams.err, level, message);
    }

    /// Log info message
    pub fn log_info(&mut self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Log warning message
    pub fn log_warn(&mut self, message: &str) {
        self.log(Level::Warning, message);
    }

    /// Log success message
    pub fn log_success(&mut self, message: &str) {
        self.log(Level::Success, message);
    }

    /// Log debug message
    pub fn log_debug(&mut self, message: &str) {
        self.log(Level::Debug, message);
    }

    /// Log critical message
    pub fn log_critical(&mut self, message: &str) {
        self.log(Level::Critical, message);
    }

    /// Render this command's help through the selected writer.
    pub fn render_help(&mut self) -> CliResult<()> {
        let help = self.dispatcher.help_for(&self.path)?;
        let writer = self.writer();
        let mut out = writer.wrap(&mut *self.streams.out);
        write!(out, "{}", help)?;
        out.flush()?;
        Ok(())
    }

    /// Dispatch another command line through the same dispatcher and streams.
    pub fn redispatch(&mut self, args: Vec<String>) -> CliResult<()> {
        self.dispatcher.execute_from(args, &mut *self.streams)
    }
}

/// Writer for `store`: the true-color signal wins over the fab option.
pub(crate) fn select_writer(store: &ConfigStore, env: &EnvironmentLoader) -> OutputWriter {
    OutputWriter::select(store.get_or(&FABULOUS, false), env.truecolor())
}

fn logger_for(store: &ConfigStore, env: &EnvironmentLoader) -> Logger {
    Logger::new(store.get_or(&VERBOSE, 3), store.get_or(&COLOR, true))
        .with_fabulous(store.get_or(&FABULOUS, false), env.truecolor())
}
