//! Miscellaneous commands
//!
//! - version: print build information as JSON
//! - image: show the default machine image per profile

use serde::Serialize;

use crate::cli::error::CliError;
use crate::cli::node::CommandNode;
use crate::cli::profiles::{self, PROFILES};

/// Build information embedded at compile time
///
/// Optional fields come from `KUBICORN_GIT_SHA`, `KUBICORN_BUILD_DATE` and
/// `KUBICORN_RUSTC_VERSION` in the build environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Crate version
    pub version: &'static str,
    /// Short git commit SHA
    pub git_commit: Option<&'static str>,
    /// Build date/time
    pub build_date: Option<&'static str>,
    /// Rust compiler version used for the build
    pub rustc_version: Option<&'static str>,
    /// "release" or "debug"
    pub build_profile: &'static str,
    /// Target operating system
    pub os: &'static str,
    /// Target architecture
    pub arch: &'static str,
}

impl VersionInfo {
    /// Information about the running binary
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("KUBICORN_GIT_SHA"),
            build_date: option_env!("KUBICORN_BUILD_DATE"),
            rustc_version: option_env!("KUBICORN_RUSTC_VERSION"),
            build_profile: if cfg!(debug_assertions) { "debug" } else { "release" },
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

/// `kubicorn version`
pub fn version() -> CommandNode {
    CommandNode::new("version", "Verify kubicorn version").with_action_fn(|ctx, _| {
        let info = serde_json::to_string_pretty(&VersionInfo::current())?;
        writeln!(ctx.out(), "{}", info)?;
        Ok(())
    })
}

/// `kubicorn image`
pub fn image() -> CommandNode {
    CommandNode::new("image", "Show the default machine image of a profile")
        .with_long(
            "List the machine image each profile provisions with, or the image of one profile.",
        )
        .with_args_name("PROFILE")
        .with_action_fn(|ctx, args| {
            let selected = match args {
                [] => PROFILES.iter().collect::<Vec<_>>(),
                [name] => vec![profiles::lookup(name)
                    .ok_or_else(|| CliError::InvalidInput(format!("unknown profile '{}'", name)))?],
                _ => return Err(CliError::InvalidInput("too many arguments".to_string())),
            };

            let out = ctx.out();
            for profile in selected {
                writeln!(out, "{:<14} {:<14} {}", profile.name, profile.size, profile.image)?;
            }
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_utils::{dispatch_with, dispatch_with_input, TestState};

    #[test]
    fn test_version_is_json() {
        let (result, out, _) = dispatch_with(None, &["kubicorn", "version"]);
        result.unwrap();

        let value: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["os"], std::env::consts::OS);
    }

    #[test]
    fn test_image_lists_every_profile() {
        let state = TestState::new();
        let out = state.run(&["image"]).unwrap();
        assert_eq!(out.lines().count(), PROFILES.len());
        assert!(out.contains("ami-835b4efa"));
    }

    #[test]
    fn test_image_for_alias() {
        let state = TestState::new();
        let out = state.run(&["image", "do"]).unwrap();
        assert_eq!(out.trim_end(), format!("{:<14} {:<14} {}", "digitalocean", "2gb", "ubuntu-16-04-x64"));
    }

    #[test]
    fn test_image_without_config_file() {
        let (result, out, _, loads) = dispatch_with_input(None, &["kubicorn", "image", "gce"], "");
        result.unwrap();
        assert!(out.contents().starts_with("google"));
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn test_image_unknown_profile() {
        let state = TestState::new();
        assert!(matches!(state.run(&["image", "azure"]), Err(CliError::InvalidInput(_))));
    }
}
