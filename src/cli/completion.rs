//! Completion annotations and shell completion scripts.
//!
//! Options can carry completion hints: names of shell functions that produce
//! candidate values (e.g. the cluster names in the state store). The bash
//! script appends those functions to the clap_complete output and routes
//! completion through them first.

use clap::Command;
use clap_complete::{generate, Shell};

use super::node::CommandNode;

/// Shell function completing cluster names from `kubicorn list`
pub const PARSE_LIST: &str = "__kubicorn_parse_list";
/// Shell function completing profile names
pub const PARSE_PROFILES: &str = "__kubicorn_parse_profiles";

/// The option whose hints also complete the leading positional argument
const NAME_OPTION: &str = "name";

/// Result of attaching a completion hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateOutcome {
    /// The hint was appended to the option's list
    Attached,
    /// The node declares no such option; nothing changed
    OptionNotFound,
}

/// Attach `hint` to the option `flag` declared on `node`.
///
/// Hints accumulate in attachment order; attaching the same hint twice keeps
/// both entries.
pub fn annotate(node: &mut CommandNode, flag: &str, hint: &str) -> AnnotateOutcome {
    if node.option(flag).is_none() {
        return AnnotateOutcome::OptionNotFound;
    }
    node.push_annotation(flag, hint);
    AnnotateOutcome::Attached
}

/// Generate the completion script for `shell`.
pub fn generate_script(
    shell: Shell,
    cmd: &mut Command,
    root: &CommandNode,
    profiles: &[&str],
) -> String {
    let mut buffer = Vec::new();
    generate(shell, cmd, root.name(), &mut buffer);
    let mut output = String::from_utf8_lossy(&buffer).into_owned();

    if matches!(shell, Shell::Bash) {
        output.push_str(&bash_custom_block(root, profiles));
    }

    output
}

const BASH_CUSTOM: &str = r#"
__kubicorn_parse_list()
{
    local kubicorn_out
    if kubicorn_out=$(kubicorn list --no-headers 2>/dev/null); then
        COMPREPLY=( $( compgen -W "${kubicorn_out[*]}" -- "$cur" ) )
    fi
}

__kubicorn_parse_profiles()
{
    local kubicorn_out=(@PROFILES@)
    COMPREPLY=( $( compgen -W "${kubicorn_out[*]}" -- "$cur" ) )
}

__kubicorn_custom_func()
{
    local word command=""
    for word in "${COMP_WORDS[@]:1:COMP_CWORD-1}"; do
        case "${word}" in
            @COMMANDS@)
                command="${word}"
                break
                ;;
        esac
    done
    [[ -z "${command}" ]] && return 1

    case "${command}:${prev}" in
@FLAG_CASES@    esac

    [[ "${cur}" == -* ]] && return 1
    case "${command}" in
@POSITIONAL_CASES@    esac
    return 1
}

_kubicorn_custom()
{
    local cur prev
    cur="${COMP_WORDS[COMP_CWORD]}"
    prev="${COMP_WORDS[COMP_CWORD-1]}"
    COMPREPLY=()
    __kubicorn_custom_func && return 0
    _kubicorn "$@"
}

complete -F _kubicorn_custom -o bashdefault -o default kubicorn
"#;

/// Bash functions backing the completion hints of the tree under `root`.
pub fn bash_custom_block(root: &CommandNode, profiles: &[&str]) -> String {
    let mut commands = Vec::new();
    let mut flag_cases = String::new();
    let mut positional_cases = String::new();

    for child in root.children() {
        commands.push(child.name());

        for (flag, hints) in child.all_annotations() {
            let calls = hints.join("; ");

            let mut patterns = vec![format!("{}:--{}", child.name(), flag)];
            if let Some(short) = child.option(flag).and_then(|o| o.shorthand) {
                patterns.push(format!("{}:-{}", child.name(), short));
            }
            flag_cases.push_str(&case_arm(&patterns.join(" | "), &calls));

            if flag == NAME_OPTION {
                positional_cases.push_str(&case_arm(child.name(), &calls));
            }
        }
    }

    BASH_CUSTOM
        .replace("@PROFILES@", &profiles.join(" "))
        .replace("@COMMANDS@", &commands.join(" | "))
        .replace("@FLAG_CASES@", &flag_cases)
        .replace("@POSITIONAL_CASES@", &positional_cases)
}

fn case_arm(pattern: &str, calls: &str) -> String {
    format!(
        "        {})\n            {}\n            return 0\n            ;;\n",
        pattern, calls
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::binder::declare_string;

    fn tree() -> CommandNode {
        let mut root = CommandNode::new("kubicorn", "root");

        let mut apply = CommandNode::new("apply", "Apply").with_action_fn(|_, _| Ok(()));
        declare_string(&mut apply, "name", Some('n'), "", "Cluster name").unwrap();
        annotate(&mut apply, "name", PARSE_LIST);
        root.add_child(apply).unwrap();

        let mut create = CommandNode::new("create", "Create").with_action_fn(|_, _| Ok(()));
        declare_string(&mut create, "profile", Some('p'), "aws", "Profile").unwrap();
        annotate(&mut create, "profile", PARSE_PROFILES);
        root.add_child(create).unwrap();

        root
    }

    #[test]
    fn test_annotate_attaches_in_order() {
        let mut node = CommandNode::new("apply", "Apply");
        declare_string(&mut node, "name", Some('n'), "", "Cluster name").unwrap();

        assert_eq!(annotate(&mut node, "name", PARSE_LIST), AnnotateOutcome::Attached);
        assert_eq!(annotate(&mut node, "name", "__other"), AnnotateOutcome::Attached);
        assert_eq!(annotate(&mut node, "name", PARSE_LIST), AnnotateOutcome::Attached);
        assert_eq!(node.annotations("name"), [PARSE_LIST, "__other", PARSE_LIST]);
    }

    #[test]
    fn test_annotate_missing_option_is_noop() {
        let mut node = CommandNode::new("apply", "Apply");
        assert_eq!(annotate(&mut node, "nope", PARSE_LIST), AnnotateOutcome::OptionNotFound);
        assert!(node.all_annotations().is_empty());
    }

    #[test]
    fn test_bash_block_routes_hints() {
        let block = bash_custom_block(&tree(), &["amazon", "aws"]);

        assert!(block.contains("kubicorn_out=(amazon aws)"));
        assert!(block.contains("apply | create)"));
        assert!(block.contains("apply:--name | apply:-n)\n            __kubicorn_parse_list"));
        assert!(block.contains("create:--profile | create:-p)\n            __kubicorn_parse_profiles"));
        // positional completion only for the name option
        assert!(block.contains("        apply)\n            __kubicorn_parse_list"));
        assert!(!block.contains("        create)\n"));
        assert!(block.contains("complete -F _kubicorn_custom"));
    }

    #[test]
    fn test_generate_script_for_each_shell() {
        let root = tree();
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
            let mut cmd = root.to_clap();
            let script = generate_script(shell, &mut cmd, &root, &["aws"]);
            assert!(script.contains("kubicorn"));
            assert_eq!(script.contains(PARSE_LIST), shell == Shell::Bash);
        }
    }
}
