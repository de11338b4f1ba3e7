//! Option descriptors, typed option keys and the values they resolve to.
//!
//! An option is declared once as an [`OptionDescriptor`]. The descriptor is
//! what the command tree turns into a flag and what the resolver uses to find
//! the option's value in the environment and in the config file. Declaring an
//! option hands back an [`OptionKey`], a typed handle used to read the final
//! value out of a [`ConfigStore`](super::ConfigStore).

use std::fmt;
use std::marker::PhantomData;

/// Kind of value an option holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Signed integer (`--verbose 4`)
    Int,
    /// Boolean (`--fab`, `--color=false`)
    Bool,
    /// Free-form string (`--profile aws`)
    Str,
}

impl OptionKind {
    /// Human readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Int => "an integer",
            OptionKind::Bool => "a boolean",
            OptionKind::Str => "a string",
        }
    }
}

/// A resolved or default option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// String value
    Str(String),
}

impl OptionValue {
    /// The kind of this value
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Str(_) => OptionKind::Str,
        }
    }

    /// Parse a textual value (environment variable, flag text) as `kind`.
    ///
    /// Booleans accept the usual spellings: `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn parse(kind: OptionKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            OptionKind::Int => raw.parse().ok().map(OptionValue::Int),
            OptionKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(OptionValue::Bool(true)),
                "false" | "0" | "no" | "off" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            OptionKind::Str => Some(OptionValue::Str(raw.to_string())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// Declarative description of one option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    /// Long flag name, config file key and environment suffix
    pub name: String,
    /// Single character alias (`-v`)
    pub shorthand: Option<char>,
    /// Value used when no layer supplies one
    pub default: OptionValue,
    /// Help text shown in usage output
    pub help: String,
    /// Persistent options are visible to every descendant command
    pub persistent: bool,
}

impl OptionDescriptor {
    /// Describe an integer option
    pub fn int(
        name: impl Into<String>,
        shorthand: Option<char>,
        default: i64,
        help: impl Into<String>,
    ) -> Self {
        Self::new(name, shorthand, OptionValue::Int(default), help)
    }

    /// Describe a boolean option
    pub fn bool(
        name: impl Into<String>,
        shorthand: Option<char>,
        default: bool,
        help: impl Into<String>,
    ) -> Self {
        Self::new(name, shorthand, OptionValue::Bool(default), help)
    }

    /// Describe a string option
    pub fn string(
        name: impl Into<String>,
        shorthand: Option<char>,
        default: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::new(name, shorthand, OptionValue::Str(default.into()), help)
    }

    fn new(
        name: impl Into<String>,
        shorthand: Option<char>,
        default: OptionValue,
        help: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            shorthand,
            default,
            help: help.into(),
            persistent: false,
        }
    }

    /// Mark the option as persistent
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// The option's kind, taken from its default
    pub fn kind(&self) -> OptionKind {
        self.default.kind()
    }

    /// Environment variable that overlays this option, e.g. `KUBICORN_STATE_STORE_PATH`
    pub fn env_var(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.name.to_uppercase().replace('-', "_"))
    }
}

/// Rust types an option can be read as
pub trait OptionType: Sized {
    /// Kind of option this type reads
    const KIND: OptionKind;

    /// Extract the typed value, `None` on a kind mismatch
    fn from_value(value: &OptionValue) -> Option<Self>;
}

impl OptionType for i64 {
    const KIND: OptionKind = OptionKind::Int;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl OptionType for bool {
    const KIND: OptionKind = OptionKind::Bool;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl OptionType for String {
    const KIND: OptionKind = OptionKind::Str;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Typed handle to a declared option.
///
/// Keys are cheap to copy and carry no value themselves; the value lives in
/// the [`ConfigStore`](super::ConfigStore) built for a dispatch.
pub struct OptionKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: OptionType> OptionKey<T> {
    /// Key for the option called `name`
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T> OptionKey<T> {
    /// Option name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for OptionKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OptionKey<T> {}

impl<T> fmt::Debug for OptionKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OptionKey").field(&self.name).finish()
    }
}

/// Log level: 1 critical, 2 warnings, 3 info, 4 debug
pub const VERBOSE: OptionKey<i64> = OptionKey::new("verbose");
/// Colorized log output
pub const COLOR: OptionKey<bool> = OptionKey::new("color");
/// Rainbow output
pub const FABULOUS: OptionKey<bool> = OptionKey::new("fab");

/// Options declared on the root command and inherited by every subcommand
pub fn persistent_options() -> Vec<OptionDescriptor> {
    vec![
        OptionDescriptor::int(VERBOSE.name(), Some('v'), 3, "Log level").persistent(),
        OptionDescriptor::bool(COLOR.name(), Some('C'), true, "Toggle colorized logs").persistent(),
        OptionDescriptor::bool(FABULOUS.name(), Some('f'), false, "Toggle fabulous output")
            .persistent(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        assert_eq!(OptionValue::parse(OptionKind::Bool, "yes"), Some(OptionValue::Bool(true)));
        assert_eq!(OptionValue::parse(OptionKind::Bool, "OFF"), Some(OptionValue::Bool(false)));
        assert_eq!(OptionValue::parse(OptionKind::Bool, "maybe"), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(OptionValue::parse(OptionKind::Int, " 7 "), Some(OptionValue::Int(7)));
        assert_eq!(OptionValue::parse(OptionKind::Int, "seven"), None);
    }

    #[test]
    fn test_env_var_name() {
        let desc = OptionDescriptor::string("state-store-path", None, "", "State store");
        assert_eq!(desc.env_var("KUBICORN"), "KUBICORN_STATE_STORE_PATH");
        assert_eq!(persistent_options()[0].env_var("KUBICORN"), "KUBICORN_VERBOSE");
    }

    #[test]
    fn test_persistent_defaults() {
        let opts = persistent_options();
        assert_eq!(opts.len(), 3);
        assert!(opts.iter().all(|o| o.persistent));
        assert_eq!(opts[0].default, OptionValue::Int(3));
        assert_eq!(opts[1].default, OptionValue::Bool(true));
        assert_eq!(opts[2].default, OptionValue::Bool(false));
        assert_eq!(opts[2].shorthand, Some('f'));
    }
}
