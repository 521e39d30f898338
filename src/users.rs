//! User and group name/id tables.
//!
//! Package databases record owners by name while the filesystem records
//! numeric ids, so both directions are needed.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Name <-> id tables read from passwd and group files.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    users: HashMap<String, u32>,
    groups: HashMap<String, u32>,
}

impl IdMap {
    /// Read `etc/passwd` and `etc/group` under `root`.
    ///
    /// Missing files are fine (empty tables); unreadable or corrupted files
    /// are errors.
    pub fn load(root: &Path) -> Result<Self> {
        let users = read_table(&root.join("etc/passwd"), 3)?;
        let groups = read_table(&root.join("etc/group"), 3)?;
        Ok(Self { users, groups })
    }

    /// Tables of the running system, or empty tables if they can't be read.
    pub fn system() -> Self {
        match Self::load(Path::new("/")) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("user/group tables unavailable: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn with_user(mut self, name: &str, uid: u32) -> Self {
        self.users.insert(name.to_string(), uid);
        self
    }

    pub fn with_group(mut self, name: &str, gid: u32) -> Self {
        self.groups.insert(name.to_string(), gid);
        self
    }

    pub fn uid(&self, name: &str) -> Option<u32> {
        self.users.get(name).copied()
    }

    pub fn gid(&self, name: &str) -> Option<u32> {
        self.groups.get(name).copied()
    }

    /// User name for `uid`, or the number itself.
    pub fn user_name(&self, uid: u32) -> String {
        lookup_name(&self.users, uid)
    }

    /// Group name for `gid`, or the number itself.
    pub fn group_name(&self, gid: u32) -> String {
        lookup_name(&self.groups, gid)
    }
}

fn lookup_name(table: &HashMap<String, u32>, id: u32) -> String {
    // Several names may share an id; pick the smallest for stable output.
    table
        .iter()
        .filter(|(_, v)| **v == id)
        .map(|(k, _)| k.as_str())
        .min()
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

/// Parse a colon separated `name:x:id:...` file.
fn read_table(path: &Path, min_fields: usize) -> Result<HashMap<String, u32>> {
    let mut table = HashMap::new();
    if !path.exists() {
        return Ok(table);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < min_fields {
            continue;
        }
        let id: u32 = parts[2].parse().with_context(|| {
            format!(
                "Corrupted file: invalid id '{}' for '{}' at {}",
                parts[2],
                parts[0],
                path.display()
            )
        })?;
        table.insert(parts[0].to_string(), id);
    }
    Ok(table)
}
