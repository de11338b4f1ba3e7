//! Built-in cluster profiles.

/// Defaults applied to a cluster created from a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    /// Canonical profile name
    pub name: &'static str,
    /// Alternative spellings accepted on the command line
    pub aliases: &'static [&'static str],
    /// Cloud the profile provisions on
    pub cloud: &'static str,
    /// Default machine image
    pub image: &'static str,
    /// Default machine size
    pub size: &'static str,
}

/// Every profile the tool knows
pub const PROFILES: &[Profile] = &[
    Profile {
        name: "amazon",
        aliases: &["aws"],
        cloud: "amazon",
        image: "ami-835b4efa",
        size: "t2.medium",
    },
    Profile {
        name: "digitalocean",
        aliases: &["do"],
        cloud: "digitalocean",
        image: "ubuntu-16-04-x64",
        size: "2gb",
    },
    Profile {
        name: "google",
        aliases: &["gce"],
        cloud: "google",
        image: "ubuntu-1604-xenial-v20170307",
        size: "n1-standard-1",
    },
];

/// Profile by name or alias
pub fn lookup(name: &str) -> Option<&'static Profile> {
    PROFILES
        .iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
}

/// All accepted spellings, used for shell completion
pub fn spellings() -> Vec<&'static str> {
    PROFILES
        .iter()
        .flat_map(|p| std::iter::once(p.name).chain(p.aliases.iter().copied()))
        .collect()
}
