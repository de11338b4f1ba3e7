//! Layered option resolution.
//!
//! [`resolve`] is a pure function: given the declared options and the three
//! layers it produces a [`ConfigStore`] where every option holds the value of
//! the highest-precedence layer that supplied one (flag > environment > file >
//! default). Nothing here touches the filesystem or the process environment.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::config::FileLayer;
use super::environment::EnvironmentLoader;
use super::error::{ConfigError, ConfigResult};
use super::options::{OptionDescriptor, OptionKey, OptionKind, OptionType, OptionValue};

/// Layer a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueSource {
    /// Declared default
    Default,
    /// Configuration file
    File,
    /// `KUBICORN_*` environment variable
    Env,
    /// Command-line flag
    Flag,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueSource::Default => "default",
            ValueSource::File => "config file",
            ValueSource::Env => "environment",
            ValueSource::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// Flag values supplied on the command line, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagLayer {
    values: BTreeMap<String, OptionValue>,
}

impl FlagLayer {
    /// Empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flag value
    pub fn set(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.set(name, value);
        self
    }

    /// Value given for `name`
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }
}

/// A resolved value and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Final value
    pub value: OptionValue,
    /// Winning layer
    pub source: ValueSource,
}

/// Read-only view of every option visible to the dispatched command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: BTreeMap<String, Resolved>,
    file_loaded: bool,
}

impl ConfigStore {
    /// Typed value of a declared option
    pub fn get<T: OptionType>(&self, key: &OptionKey<T>) -> ConfigResult<T> {
        let resolved = self
            .values
            .get(key.name())
            .ok_or_else(|| ConfigError::Undeclared(key.name().to_string()))?;

        T::from_value(&resolved.value).ok_or_else(|| {
            ConfigError::invalid_value(
                key.name(),
                resolved.value.to_string(),
                "declaration",
                T::KIND.as_str(),
            )
        })
    }

    /// Typed value, falling back to `fallback` when the option is not visible
    pub fn get_or<T: OptionType>(&self, key: &OptionKey<T>, fallback: T) -> T {
        self.get(key).unwrap_or(fallback)
    }

    /// Resolved entry by name
    pub fn lookup(&self, name: &str) -> Option<&Resolved> {
        self.values.get(name)
    }

    /// Layer the value of `name` came from
    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.values.get(name).map(|r| r.source)
    }

    /// Whether the configuration file took part in resolution
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// All resolved options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resolved)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Resolve `descriptors` against the layers.
///
/// `file` is `None` when the configuration file was not read for this
/// dispatch; the remaining layers still apply.
pub fn resolve(
    descriptors: &[OptionDescriptor],
    file: Option<&FileLayer>,
    env: &EnvironmentLoader,
    flags: &FlagLayer,
) -> ConfigResult<ConfigStore> {
    let mut values = BTreeMap::new();

    for desc in descriptors {
        let resolved = resolve_one(desc, file, env, flags)?;
        values.insert(desc.name.clone(), resolved);
    }

    Ok(ConfigStore {
        values,
        file_loaded: file.is_some(),
    })
}

/// Like [`resolve`], but an option whose layers hold an unusable value keeps
/// its declared default. The errors are returned next to the store.
pub fn resolve_lenient(
    descriptors: &[OptionDescriptor],
    file: Option<&FileLayer>,
    env: &EnvironmentLoader,
    flags: &FlagLayer,
) -> (ConfigStore, Vec<ConfigError>) {
    let mut values = BTreeMap::new();
    let mut errors = Vec::new();

    for desc in descriptors {
        let resolved = resolve_one(desc, file, env, flags).unwrap_or_else(|err| {
            errors.push(err);
            Resolved {
                value: desc.default.clone(),
                source: ValueSource::Default,
            }
        });
        values.insert(desc.name.clone(), resolved);
    }

    let store = ConfigStore {
        values,
        file_loaded: file.is_some(),
    };
    (store, errors)
}

fn resolve_one(
    desc: &OptionDescriptor,
    file: Option<&FileLayer>,
    env: &EnvironmentLoader,
    flags: &FlagLayer,
) -> ConfigResult<Resolved> {
    let kind = desc.kind();

    if let Some(value) = flags.get(&desc.name) {
        if value.kind() != kind {
            return Err(ConfigError::invalid_value(
                &desc.name,
                value.to_string(),
                "flag",
                kind.as_str(),
            ));
        }
        return Ok(Resolved {
            value: value.clone(),
            source: ValueSource::Flag,
        });
    }

    if let Some(raw) = env.lookup(desc) {
        let value = OptionValue::parse(kind, raw).ok_or_else(|| {
            ConfigError::invalid_value(&desc.name, raw, "environment", kind.as_str())
        })?;
        return Ok(Resolved {
            value,
            source: ValueSource::Env,
        });
    }

    if let Some(raw) = file.and_then(|f| f.get(&desc.name)) {
        if !raw.is_null() {
            let value = from_yaml(kind, raw).ok_or_else(|| {
                ConfigError::invalid_value(&desc.name, yaml_text(raw), "config file", kind.as_str())
            })?;
            return Ok(Resolved {
                value,
                source: ValueSource::File,
            });
        }
    }

    Ok(Resolved {
        value: desc.default.clone(),
        source: ValueSource::Default,
    })
}

fn from_yaml(kind: OptionKind, raw: &Value) -> Option<OptionValue> {
    match (kind, raw) {
        (OptionKind::Int, Value::Number(n)) => n.as_i64().map(OptionValue::Int),
        (OptionKind::Bool, Value::Bool(b)) => Some(OptionValue::Bool(*b)),
        (OptionKind::Str, Value::String(s)) => Some(OptionValue::Str(s.clone())),
        (OptionKind::Str, Value::Number(n)) => Some(OptionValue::Str(n.to_string())),
        // Quoted scalars such as `verbose: "5"` go through the textual parser.
        (_, Value::String(s)) => OptionValue::parse(kind, s),
        _ => None,
    }
}

fn yaml_text(raw: &Value) -> String {
    serde_yaml::to_string(raw)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", raw))
}
