//! YAML configuration file loading.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};

/// Default configuration file, relative to the user's home directory
pub const DEFAULT_CONFIG_FILE: &str = "~/.kubicorn/kubicorn.cfg";

/// Expand `~` and environment references in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => match path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(path)),
            None => PathBuf::from(path),
        },
    }
}

/// The default configuration path with the home directory expanded
pub fn default_config_path() -> PathBuf {
    expand_path(DEFAULT_CONFIG_FILE)
}

/// Top-level keys of a configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileLayer {
    path: Option<PathBuf>,
    values: BTreeMap<String, Value>,
}

impl FileLayer {
    /// Parse a YAML document. An empty document yields an empty layer.
    pub fn from_yaml_str(content: &str, path: &Path) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::empty_at(path));
        }

        let document: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mapping = match document {
            Value::Null => return Ok(Self::empty_at(path)),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(ConfigError::NotAMapping {
                    path: path.to_path_buf(),
                })
            }
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            match key {
                Value::String(key) => {
                    values.insert(key, value);
                }
                _ => {
                    return Err(ConfigError::NotAMapping {
                        path: path.to_path_buf(),
                    })
                }
            }
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    fn empty_at(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            values: BTreeMap::new(),
        }
    }

    /// Build a layer from in-memory values
    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            path: None,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Raw value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The file this layer was read from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Keys present in the document
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Where configuration comes from.
///
/// The initializer calls `load` at most once per process invocation.
pub trait ConfigSource {
    /// Read and parse the configuration
    fn load(&self) -> ConfigResult<FileLayer>;

    /// Human readable location, used in log output
    fn describe(&self) -> String;
}

/// Configuration read from a YAML file on disk.
///
/// A file named explicitly must exist. An optional source treats a missing
/// file as an empty document; malformed content is an error either way.
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
    optional: bool,
}

impl YamlFileSource {
    /// Source reading `path`, which must exist
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            optional: false,
        }
    }

    /// Source reading `path` if it exists
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            optional: true,
        }
    }

    /// Pick the file: explicit flag, then `KUBICORN_CONFIG`, then the default location.
    ///
    /// Only the default location may be absent.
    pub fn resolve(flag: Option<&str>, env: Option<&str>) -> Self {
        match flag.or(env) {
            Some(path) => Self::new(expand_path(path)),
            None => Self::optional(default_config_path()),
        }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a missing file reads as an empty document
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl ConfigSource for YamlFileSource {
    fn load(&self) -> ConfigResult<FileLayer> {
        let read_err = |source| ConfigError::Read {
            path: self.path.clone(),
            source,
        };

        // The handle is dropped at the end of this block, before parsing.
        let content = {
            let mut file = match File::open(&self.path) {
                Ok(file) => file,
                Err(err) if self.optional && err.kind() == ErrorKind::NotFound => {
                    return Ok(FileLayer::empty_at(&self.path));
                }
                Err(err) => return Err(read_err(err)),
            };
            let mut content = String::new();
            file.read_to_string(&mut content).map_err(read_err)?;
            content
        };

        FileLayer::from_yaml_str(&content, &self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
