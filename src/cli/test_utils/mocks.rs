//! Shared buffers, in-memory config sources and dispatch helpers for tests

use std::cell::Cell;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::cli::context::Streams;
use crate::cli::dispatcher::Dispatcher;
use crate::cli::error::CliResult;
use crate::cli::registry::CommandRegistry;
use crate::cli::state::FsClusterStore;
use crate::config::{
    ConfigError, ConfigResult, ConfigSource, EnvironmentLoader, FileLayer, YamlFileSource,
};

/// Writer whose contents stay readable after it is handed to a dispatch
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Streams writing into shared buffers and reading `input`
pub fn shared_streams(input: &str) -> (Streams, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let streams = Streams::new(
        Box::new(out.clone()),
        Box::new(err.clone()),
        Box::new(Cursor::new(input.as_bytes().to_vec())),
    );
    (streams, out, err)
}

/// Config source holding a YAML document in memory; `None` fails like a missing file
pub struct MemorySource {
    yaml: Option<String>,
    loads: Rc<Cell<usize>>,
}

impl MemorySource {
    pub fn new(yaml: Option<&str>) -> (Self, Rc<Cell<usize>>) {
        let loads = Rc::new(Cell::new(0));
        let source = Self {
            yaml: yaml.map(str::to_string),
            loads: Rc::clone(&loads),
        };
        (source, loads)
    }
}

impl ConfigSource for MemorySource {
    fn load(&self) -> ConfigResult<FileLayer> {
        self.loads.set(self.loads.get() + 1);
        match &self.yaml {
            Some(yaml) => FileLayer::from_yaml_str(yaml, Path::new("memory.cfg")),
            None => Err(ConfigError::Read {
                path: PathBuf::from("memory.cfg"),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }

    fn describe(&self) -> String {
        "memory.cfg".to_string()
    }
}

/// Counts loads of a wrapped source
struct CountingSource<S> {
    inner: S,
    loads: Rc<Cell<usize>>,
}

impl<S: ConfigSource> ConfigSource for CountingSource<S> {
    fn load(&self) -> ConfigResult<FileLayer> {
        self.loads.set(self.loads.get() + 1);
        self.inner.load()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

fn empty_env() -> EnvironmentLoader {
    EnvironmentLoader::from_vars("KUBICORN", Vec::<(String, String)>::new())
}

/// Dispatch `args` against the full registry with an in-memory config document
pub fn dispatch_with(
    yaml: Option<&str>,
    args: &[&str],
) -> (CliResult<()>, SharedBuffer, SharedBuffer) {
    let (result, out, err, _) = dispatch_with_input(yaml, args, "");
    (result, out, err)
}

/// Like [`dispatch_with`], feeding `input` and reporting config loads
pub fn dispatch_with_input(
    yaml: Option<&str>,
    args: &[&str],
    input: &str,
) -> (CliResult<()>, SharedBuffer, SharedBuffer, Rc<Cell<usize>>) {
    let (source, loads) = MemorySource::new(yaml);
    let (result, out, err) = dispatch_from(source, args, input);
    (result, out, err, loads)
}

/// Dispatch `args` against the full registry reading configuration from `source`
pub fn dispatch_from(
    source: impl ConfigSource + 'static,
    args: &[&str],
    input: &str,
) -> (CliResult<()>, SharedBuffer, SharedBuffer) {
    let dispatcher = Dispatcher::new(CommandRegistry::new().unwrap())
        .with_env(empty_env())
        .with_source(source);
    let (mut streams, out, err) = shared_streams(input);
    let result = dispatcher.execute_from(args.iter().copied(), &mut streams);
    (result, out, err)
}

/// A temporary state store with a config file pointing at it
pub struct TestState {
    dir: TempDir,
    config: PathBuf,
    loads: Rc<Cell<usize>>,
}

impl TestState {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended to the generated config file
    pub fn with_config(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("kubicorn.cfg");
        let content = format!(
            "state-store-path: '{}'\n{}",
            dir.path().join("_state").display(),
            extra
        );
        std::fs::write(&config, content).unwrap();
        Self {
            dir,
            config,
            loads: Rc::new(Cell::new(0)),
        }
    }

    pub fn store(&self) -> FsClusterStore {
        FsClusterStore::new(self.dir.path().join("_state"))
    }

    /// Config file loads across every run so far
    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    /// Run `kubicorn <args>` in a fresh dispatcher, returning its output
    pub fn run(&self, args: &[&str]) -> CliResult<String> {
        self.run_with_input(args, "")
    }

    pub fn run_with_input(&self, args: &[&str], input: &str) -> CliResult<String> {
        let source = CountingSource {
            inner: YamlFileSource::new(&self.config),
            loads: Rc::clone(&self.loads),
        };
        let dispatcher = Dispatcher::new(CommandRegistry::new()?)
            .with_env(empty_env())
            .with_source(source);

        let (mut streams, out, _) = shared_streams(input);
        let argv = std::iter::once("kubicorn").chain(args.iter().copied());
        dispatcher.execute_from(argv, &mut streams)?;
        Ok(out.contents())
    }
}
