//! Environment variable layer.
//!
//! Only variables carrying the tool's prefix are considered. The loader takes
//! a snapshot at construction so resolution never observes a half-changed
//! environment, and tests can hand in their own variables.

use std::collections::HashMap;
use std::env;

use super::options::OptionDescriptor;

/// Prefix shared by every environment variable the tool reads
pub const ENV_PREFIX: &str = "KUBICORN";

/// Snapshot of prefixed environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentLoader {
    prefix: String,
    vars: HashMap<String, String>,
}

impl EnvironmentLoader {
    /// Snapshot the process environment for `prefix`.
    pub fn new(prefix: &str) -> Self {
        Self::from_vars(prefix, env::vars())
    }

    /// Build a loader from explicit variables; names without the prefix are dropped.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let wanted = format!("{}_", prefix);
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(&wanted))
            .collect();

        Self {
            prefix: prefix.to_string(),
            vars,
        }
    }

    /// The prefix this loader was built for
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Value of `PREFIX_<SUFFIX>`; empty values count as unset.
    pub fn get(&self, suffix: &str) -> Option<&str> {
        let key = format!("{}_{}", self.prefix, suffix.to_uppercase().replace('-', "_"));
        self.vars
            .get(&key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value overlaying `descriptor`, if set.
    pub fn lookup(&self, descriptor: &OptionDescriptor) -> Option<&str> {
        self.get(&descriptor.name)
    }

    /// Whether the true-color rendering signal is present.
    pub fn truecolor(&self) -> bool {
        self.get("TRUECOLOR").is_some()
    }

    /// Config file path override (`KUBICORN_CONFIG`)
    pub fn config_path(&self) -> Option<&str> {
        self.get("CONFIG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_filtering() {
        let env = EnvironmentLoader::from_vars(
            "KUBICORN",
            vec![("KUBICORN_VERBOSE", "7"), ("HOME", "/root"), ("KUBICORNX", "1")],
        );
        assert_eq!(env.get("verbose"), Some("7"));
        assert_eq!(env.get("HOME"), None);
        assert_eq!(env.vars.len(), 1);
    }

    #[test]
    fn test_dashes_map_to_underscores() {
        let env = EnvironmentLoader::from_vars("KUBICORN", vec![("KUBICORN_STATE_STORE_PATH", "/tmp/state")]);
        let desc = OptionDescriptor::string("state-store-path", None, "", "");
        assert_eq!(env.lookup(&desc), Some("/tmp/state"));
    }

    #[test]
    fn test_truecolor_signal() {
        let env = EnvironmentLoader::from_vars("KUBICORN", vec![("KUBICORN_TRUECOLOR", "")]);
        assert!(!env.truecolor());

        let env = EnvironmentLoader::from_vars("KUBICORN", vec![("KUBICORN_TRUECOLOR", "1")]);
        assert!(env.truecolor());
    }

    #[test]
    fn test_process_snapshot() {
        // The snapshot only keeps prefixed variables, whatever the process has.
        let env = EnvironmentLoader::new("KUBICORN_TEST_SNAPSHOT_PREFIX");
        assert_eq!(env.prefix(), "KUBICORN_TEST_SNAPSHOT_PREFIX");
        assert!(env.vars.keys().all(|k| k.starts_with("KUBICORN_TEST_SNAPSHOT_PREFIX_")));
    }
}
