//! Option binding.
//!
//! Declaring an option registers its descriptor on a [`CommandNode`], which
//! makes it parseable as a flag there (and below, when persistent) and
//! resolvable by name from the environment and the config file. The typed
//! entry points hand back the [`OptionKey`] actions use to read the value.

use clap::builder::BoolishValueParser;
use clap::{value_parser, Arg, ArgAction};

use super::error::{CliError, CliResult};
use super::node::{CommandNode, ARGS_ID};
use crate::config::{OptionDescriptor, OptionKey, OptionKind};

/// Long flag selecting the configuration file
pub const CONFIG_ARG: &str = "config";

const RESERVED_NAMES: [&str; 3] = [CONFIG_ARG, "help", ARGS_ID];
const RESERVED_SHORTHANDS: [char; 1] = ['h'];

/// Register `descriptor` on `node`.
///
/// Fails when the name or shorthand is already declared on the node, or is
/// reserved by the dispatcher. Clashes with options inherited from ancestors
/// are caught when the registry is finalized.
pub fn declare(node: &mut CommandNode, descriptor: OptionDescriptor) -> CliResult<()> {
    if RESERVED_NAMES.contains(&descriptor.name.as_str()) {
        return Err(CliError::ValidationError(format!(
            "option name '{}' is reserved",
            descriptor.name
        )));
    }
    if let Some(short) = descriptor.shorthand {
        if RESERVED_SHORTHANDS.contains(&short) {
            return Err(CliError::ValidationError(format!("shorthand '-{}' is reserved", short)));
        }
    }

    if node.option(&descriptor.name).is_some() {
        return Err(CliError::duplicate_option(node.name(), &descriptor.name));
    }
    if let Some(short) = descriptor.shorthand {
        if node.options().iter().any(|o| o.shorthand == Some(short)) {
            return Err(CliError::duplicate_option(node.name(), format!("-{}", short)));
        }
    }

    node.push_option(descriptor);
    Ok(())
}

/// Declare an integer option
pub fn declare_int(
    node: &mut CommandNode,
    name: &'static str,
    shorthand: Option<char>,
    default: i64,
    help: &str,
) -> CliResult<OptionKey<i64>> {
    declare(node, OptionDescriptor::int(name, shorthand, default, help))?;
    Ok(OptionKey::new(name))
}

/// Declare a boolean option
pub fn declare_bool(
    node: &mut CommandNode,
    name: &'static str,
    shorthand: Option<char>,
    default: bool,
    help: &str,
) -> CliResult<OptionKey<bool>> {
    declare(node, OptionDescriptor::bool(name, shorthand, default, help))?;
    Ok(OptionKey::new(name))
}

/// Declare a string option
pub fn declare_string(
    node: &mut CommandNode,
    name: &'static str,
    shorthand: Option<char>,
    default: &str,
    help: &str,
) -> CliResult<OptionKey<String>> {
    declare(node, OptionDescriptor::string(name, shorthand, default, help))?;
    Ok(OptionKey::new(name))
}

/// Build the clap argument for a declared option.
///
/// No clap default is set: an absent flag must stay absent so the
/// environment, the config file and the declared default get their turn.
pub fn build_arg(desc: &OptionDescriptor) -> Arg {
    let mut arg = Arg::new(desc.name.clone())
        .long(desc.name.clone())
        .help(help_with_default(desc))
        .global(desc.persistent);

    if let Some(short) = desc.shorthand {
        arg = arg.short(short);
    }

    match desc.kind() {
        OptionKind::Int => arg.action(ArgAction::Set).value_parser(value_parser!(i64)),
        OptionKind::Bool => arg
            .action(ArgAction::Set)
            .value_parser(BoolishValueParser::new())
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        OptionKind::Str => arg.action(ArgAction::Set),
    }
}

fn help_with_default(desc: &OptionDescriptor) -> String {
    let default = desc.default.to_string();
    if default.is_empty() {
        desc.help.clone()
    } else {
        format!("{} [default: {}]", desc.help, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    fn parse(desc: &OptionDescriptor, args: &[&str]) -> clap::ArgMatches {
        Command::new("kubicorn")
            .arg(build_arg(desc))
            .try_get_matches_from(args)
            .unwrap()
    }

    #[test]
    fn test_declare_returns_key() {
        let mut node = CommandNode::new("create", "Create");
        let key = declare_string(&mut node, "profile", Some('p'), "aws", "Cluster profile").unwrap();
        assert_eq!(key.name(), "profile");
        assert_eq!(node.option("profile").map(|o| o.kind()), Some(OptionKind::Str));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut node = CommandNode::new("create", "Create");
        declare_int(&mut node, "count", None, 1, "Count").unwrap();

        let err = declare_bool(&mut node, "count", None, false, "Again").unwrap_err();
        assert!(matches!(err, CliError::DuplicateOption { ref option, .. } if option == "count"));
        assert_eq!(node.options().len(), 1);
    }

    #[test]
    fn test_duplicate_shorthand_is_rejected() {
        let mut node = CommandNode::new("create", "Create");
        declare_string(&mut node, "profile", Some('p'), "aws", "Profile").unwrap();

        let err = declare_bool(&mut node, "purge", Some('p'), false, "Purge").unwrap_err();
        assert!(matches!(err, CliError::DuplicateOption { ref option, .. } if option == "-p"));
    }

    #[test]
    fn test_reserved_names() {
        let mut node = CommandNode::new("create", "Create");
        assert!(declare_string(&mut node, "config", None, "", "Config").is_err());
        assert!(declare_bool(&mut node, "hidden", Some('h'), false, "Hidden").is_err());
        assert!(node.options().is_empty());
    }

    #[test]
    fn test_bool_flag_forms() {
        let desc = OptionDescriptor::bool("fab", Some('f'), false, "Toggle fabulous output");

        assert_eq!(parse(&desc, &["kubicorn", "--fab"]).get_one::<bool>("fab"), Some(&true));
        assert_eq!(parse(&desc, &["kubicorn", "-f"]).get_one::<bool>("fab"), Some(&true));
        assert_eq!(parse(&desc, &["kubicorn", "--fab=false"]).get_one::<bool>("fab"), Some(&false));
        assert_eq!(parse(&desc, &["kubicorn"]).get_one::<bool>("fab"), None);
    }

    #[test]
    fn test_int_flag_forms() {
        let desc = OptionDescriptor::int("verbose", Some('v'), 3, "Log level");

        assert_eq!(parse(&desc, &["kubicorn", "--verbose", "9"]).get_one::<i64>("verbose"), Some(&9));
        assert_eq!(parse(&desc, &["kubicorn", "-v", "4"]).get_one::<i64>("verbose"), Some(&4));
        assert_eq!(parse(&desc, &["kubicorn"]).get_one::<i64>("verbose"), None);

        let bad = Command::new("kubicorn")
            .arg(build_arg(&desc))
            .try_get_matches_from(["kubicorn", "--verbose", "loud"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_help_mentions_default() {
        let desc = OptionDescriptor::int("verbose", Some('v'), 3, "Log level");
        assert_eq!(help_with_default(&desc), "Log level [default: 3]");

        let desc = OptionDescriptor::string("name", Some('n'), "", "Cluster name");
        assert_eq!(help_with_default(&desc), "Cluster name");
    }
}
