//! Cached snapshot of the package database.
//!
//! Dumping the database once and answering every lookup from a map is much
//! faster than one `rpm -qf` per path. The snapshot lives as JSON under the
//! cache directory and is rebuilt once its mtime is older than the
//! configured expiry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{OwnedFile, OwnershipIndex};
use crate::cache;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotIndex {
    files: BTreeMap<String, OwnedFile>,
}

impl SnapshotIndex {
    pub fn from_entries(files: BTreeMap<String, OwnedFile>) -> Self {
        Self { files }
    }

    /// Load the snapshot at `cache_file`, rebuilding it with `refresh` if it
    /// is missing, older than `max_age`, or unreadable.
    pub fn load_or_refresh<F>(cache_file: &Path, max_age: Duration, refresh: F) -> Result<Self>
    where
        F: FnOnce() -> Result<BTreeMap<String, OwnedFile>>,
    {
        if !cache::is_stale(cache_file, max_age) {
            match Self::load(cache_file) {
                Ok(index) => {
                    debug!(path = %cache_file.display(), entries = index.len(), "using cached package index");
                    return Ok(index);
                }
                Err(e) => info!("cached package index unusable, rebuilding: {:#}", e),
            }
        }

        info!(path = %cache_file.display(), "refreshing package index snapshot");
        let index = Self::from_entries(refresh()?);
        index.save(cache_file)?;
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let index: Self = serde_json::from_str(&json)
            .with_context(|| format!("Corrupted package index at {}", path.display()))?;
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl OwnershipIndex for SnapshotIndex {
    fn lookup(&self, path: &str) -> Result<Option<OwnedFile>> {
        Ok(self.files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::tests::owner;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn entries() -> BTreeMap<String, OwnedFile> {
        let mut files = BTreeMap::new();
        files.insert(
            "/etc/hosts".to_string(),
            OwnedFile {
                owner: owner("setup"),
                mode: Some(0o100644),
                user: Some("root".into()),
                group: Some("root".into()),
            },
        );
        files
    }

    #[test]
    fn test_refresh_then_reuse() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("pmaker/rpmdb.json");
        let refreshes = Cell::new(0);

        let refresh = || -> Result<BTreeMap<String, OwnedFile>> {
            refreshes.set(refreshes.get() + 1);
            Ok(entries())
        };
        let first = SnapshotIndex::load_or_refresh(&cache_file, Duration::from_secs(3600), refresh).unwrap();
        assert_eq!(first.len(), 1);
        assert!(cache_file.exists());

        let second = SnapshotIndex::load_or_refresh(&cache_file, Duration::from_secs(3600), || {
            refreshes.set(refreshes.get() + 1);
            Ok(BTreeMap::new())
        })
        .unwrap();
        assert_eq!(refreshes.get(), 1);
        assert_eq!(second.owner_of("/etc/hosts").unwrap().name, "setup");
    }

    #[test]
    fn test_corrupted_snapshot_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("rpmdb.json");
        fs::write(&cache_file, "{broken").unwrap();

        let index =
            SnapshotIndex::load_or_refresh(&cache_file, Duration::from_secs(3600), || Ok(entries()))
                .unwrap();
        assert_eq!(index.len(), 1);
        assert!(SnapshotIndex::load(&cache_file).is_ok());
    }

    #[test]
    fn test_refresh_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("rpmdb.json");
        let result = SnapshotIndex::load_or_refresh(&cache_file, Duration::from_secs(1), || {
            anyhow::bail!("rpm not installed")
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_miss() {
        let index = SnapshotIndex::from_entries(entries());
        assert!(index.owner_of("/etc/passwd").is_none());
    }
}
