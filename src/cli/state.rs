//! Local cluster state store.
//!
//! Each cluster lives in its own directory under the store root, described by
//! a `cluster.yaml` document.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::profiles::Profile;

/// File name of the cluster document inside a cluster directory
pub const CLUSTER_DOCUMENT: &str = "cluster.yaml";

/// Lifecycle state recorded for a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterState {
    /// Declared, not yet applied
    Created,
    /// Applied to the cloud
    Applied,
    /// Existing infrastructure taken under management
    Adopted,
    /// Torn down; the record is kept
    Deleted,
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterState::Created => "created",
            ClusterState::Applied => "applied",
            ClusterState::Adopted => "adopted",
            ClusterState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Stored description of one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Cluster name, also the directory name
    pub name: String,
    /// Profile the cluster was created from
    pub profile: String,
    /// Target cloud
    pub cloud: String,
    /// Machine image
    pub image: String,
    /// Machine size
    pub size: String,
    /// Lifecycle state
    pub state: ClusterState,
    /// When the record was first written
    pub created_at: DateTime<Utc>,
    /// Last state change
    pub updated_at: DateTime<Utc>,
}

impl ClusterRecord {
    /// New record for `name` from `profile`
    pub fn from_profile(name: &str, profile: &Profile, state: ClusterState) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            profile: profile.name.to_string(),
            cloud: profile.cloud.to_string(),
            image: profile.image.to_string(),
            size: profile.size.to_string(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `state`, stamping the change
    pub fn transition(&mut self, state: ClusterState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Storage for cluster records
pub trait ClusterStore {
    /// Whether a record exists for `name`
    fn exists(&self, name: &str) -> bool;

    /// Write `record`, replacing any previous version
    fn commit(&self, record: &ClusterRecord) -> Result<()>;

    /// Read the record for `name`
    fn get(&self, name: &str) -> Result<ClusterRecord>;

    /// Raw document for `name`, as stored
    fn document(&self, name: &str) -> Result<String>;

    /// Names of all stored clusters, sorted
    fn list(&self) -> Result<Vec<String>>;

    /// Remove everything stored for `name`
    fn destroy(&self, name: &str) -> Result<()>;
}

/// Cluster store on the local filesystem
#[derive(Debug, Clone)]
pub struct FsClusterStore {
    root: PathBuf,
}

impl FsClusterStore {
    /// Store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `name`
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(CLUSTER_DOCUMENT)
    }

    fn check_name(name: &str) -> Result<()> {
        let separator = |c: char| c == '/' || c == '\\';
        if name.is_empty() || name.contains(separator) || name == "." || name == ".." {
            bail!("invalid cluster name '{}'", name);
        }
        Ok(())
    }
}

impl ClusterStore for FsClusterStore {
    fn exists(&self, name: &str) -> bool {
        Self::check_name(name).is_ok() && self.document_path(name).is_file()
    }

    fn commit(&self, record: &ClusterRecord) -> Result<()> {
        Self::check_name(&record.name)?;
        let path = self.document_path(&record.name);
        let dir = self.root.join(&record.name);

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cluster directory {}", dir.display()))?;

        let content = serde_yaml::to_string(record)
            .with_context(|| format!("Failed to serialize cluster '{}'", record.name))?;

        // Readers see either the old record or the new one, never a partial write.
        let temp = path.with_extension("yaml.tmp");
        fs::write(&temp, content).with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<ClusterRecord> {
        let content = self.document(name)?;
        let path = self.document_path(name);
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn document(&self, name: &str) -> Result<String> {
        Self::check_name(name)?;
        let path = self.document_path(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read state store {}", self.root.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read state store {}", self.root.display()))?;
            if entry.path().join(CLUSTER_DOCUMENT).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn destroy(&self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {}", dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::profiles;
    use tempfile::tempdir;

    fn record(name: &str) -> ClusterRecord {
        let profile = profiles::lookup("do").unwrap();
        ClusterRecord::from_profile(name, profile, ClusterState::Created)
    }

    #[test]
    fn test_commit_and_get() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path().join("_state"));

        assert!(!store.exists("alpha"));
        store.commit(&record("alpha")).unwrap();
        assert!(store.exists("alpha"));

        let loaded = store.get("alpha").unwrap();
        assert_eq!(loaded, record_with_times("alpha", &loaded));
        assert_eq!(loaded.cloud, "digitalocean");
        assert!(store.document("alpha").unwrap().contains("state: created"));
    }

    fn record_with_times(name: &str, other: &ClusterRecord) -> ClusterRecord {
        let mut expected = record(name);
        expected.created_at = other.created_at;
        expected.updated_at = other.updated_at;
        expected
    }

    #[test]
    fn test_list_is_sorted_and_skips_stray_dirs() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path());

        assert!(store.list().unwrap().is_empty());
        store.commit(&record("zeta")).unwrap();
        store.commit(&record("alpha")).unwrap();
        fs::create_dir_all(dir.path().join("not-a-cluster")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path().join("missing"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_transition_and_destroy() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path());

        let mut rec = record("beta");
        store.commit(&rec).unwrap();
        rec.transition(ClusterState::Applied);
        store.commit(&rec).unwrap();
        assert_eq!(store.get("beta").unwrap().state, ClusterState::Applied);

        store.destroy("beta").unwrap();
        assert!(!store.exists("beta"));
        store.destroy("beta").unwrap();
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path());

        assert!(store.commit(&record("../escape")).is_err());
        assert!(store.get("..").is_err());
        assert!(!store.exists(""));
    }

    #[test]
    fn test_get_missing_has_context() {
        let dir = tempdir().unwrap();
        let store = FsClusterStore::new(dir.path());
        let err = store.get("ghost").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read"));
    }
}
