//! One-time configuration initialization.
//!
//! The configuration file is read lazily: nothing happens until the first
//! command that needs configuration asks for it, and the outcome (success or
//! failure) is cached for the rest of the process.

use std::cell::OnceCell;

use super::config::{ConfigSource, FileLayer};
use super::environment::EnvironmentLoader;
use super::error::{ConfigError, ConfigResult, ConfigUnavailable};
use super::options::OptionDescriptor;
use super::resolve::{resolve, ConfigStore, FlagLayer};

/// Lifecycle of the configuration hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// The file has not been read yet
    Uninitialized,
    /// The file was read and parsed
    Initialized,
    /// Reading or parsing failed; the error is cached
    Failed,
}

/// Reads the configuration file at most once.
pub struct ConfigInitializer {
    source: Box<dyn ConfigSource>,
    env: EnvironmentLoader,
    file: OnceCell<ConfigResult<FileLayer>>,
}

impl ConfigInitializer {
    /// Hook over `source`, overlaying `env`
    pub fn new(source: Box<dyn ConfigSource>, env: EnvironmentLoader) -> Self {
        Self {
            source,
            env,
            file: OnceCell::new(),
        }
    }

    /// The environment snapshot used for the env layer
    pub fn env(&self) -> &EnvironmentLoader {
        &self.env
    }

    /// Where the configuration is read from
    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Current state
    pub fn state(&self) -> InitState {
        match self.file.get() {
            None => InitState::Uninitialized,
            Some(Ok(_)) => InitState::Initialized,
            Some(Err(_)) => InitState::Failed,
        }
    }

    /// The parsed file layer, reading it on first use.
    pub fn file_layer(&self) -> Result<&FileLayer, &ConfigError> {
        self.file.get_or_init(|| self.source.load()).as_ref()
    }

    /// Resolve with the file layer, initializing it if needed.
    pub fn resolve(
        &self,
        descriptors: &[OptionDescriptor],
        flags: &FlagLayer,
    ) -> Result<ConfigStore, ConfigUnavailable> {
        let file = self.file_layer().map_err(ConfigUnavailable::from)?;
        Ok(resolve(descriptors, Some(file), &self.env, flags)?)
    }

    /// Resolve from flags, environment and defaults only; never reads the file.
    pub fn resolve_without_file(
        &self,
        descriptors: &[OptionDescriptor],
        flags: &FlagLayer,
    ) -> ConfigResult<ConfigStore> {
        resolve(descriptors, None, &self.env, flags)
    }
}

impl std::fmt::Debug for ConfigInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigInitializer")
            .field("source", &self.source.describe())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{persistent_options, VERBOSE};
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct CountingSource {
        yaml: Option<&'static str>,
        loads: Rc<Cell<usize>>,
    }

    impl ConfigSource for CountingSource {
        fn load(&self) -> ConfigResult<FileLayer> {
            self.loads.set(self.loads.get() + 1);
            match self.yaml {
                Some(yaml) => FileLayer::from_yaml_str(yaml, std::path::Path::new("memory.cfg")),
                None => Err(ConfigError::Read {
                    path: PathBuf::from("memory.cfg"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                }),
            }
        }

        fn describe(&self) -> String {
            "memory.cfg".to_string()
        }
    }

    fn initializer(yaml: Option<&'static str>) -> (ConfigInitializer, Rc<Cell<usize>>) {
        let loads = Rc::new(Cell::new(0));
        let source = CountingSource {
            yaml,
            loads: Rc::clone(&loads),
        };
        let env = EnvironmentLoader::from_vars("KUBICORN", Vec::<(String, String)>::new());
        let init = ConfigInitializer::new(Box::new(source), env);
        (init, loads)
    }

    #[test]
    fn test_file_is_read_at_most_once() {
        let (init, loads) = initializer(Some("verbose: 5\n"));
        assert_eq!(init.state(), InitState::Uninitialized);

        for _ in 0..3 {
            let store = init.resolve(&persistent_options(), &FlagLayer::new()).unwrap();
            assert_eq!(store.get(&VERBOSE).unwrap(), 5);
        }

        assert_eq!(loads.get(), 1);
        assert_eq!(init.state(), InitState::Initialized);
    }

    #[test]
    fn test_failure_is_cached() {
        let (init, loads) = initializer(None);

        assert!(init.resolve(&persistent_options(), &FlagLayer::new()).is_err());
        assert!(init.file_layer().is_err());
        assert_eq!(loads.get(), 1);
        assert_eq!(init.state(), InitState::Failed);
    }

    #[test]
    fn test_resolve_without_file_never_reads() {
        let (init, loads) = initializer(Some("verbose: 5\n"));
        let store = init.resolve_without_file(&persistent_options(), &FlagLayer::new()).unwrap();

        assert_eq!(store.get(&VERBOSE).unwrap(), 3);
        assert_eq!(loads.get(), 0);
        assert_eq!(init.state(), InitState::Uninitialized);
    }
}
