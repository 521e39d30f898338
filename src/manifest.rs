//! The ordered result of one collection run.
//!
//! Persisted as `<workdir>/pmaker-filelist.json` so later build steps can
//! resume without collecting again. Partition and directory grouping are
//! derived on demand and never reorder the stored sequence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::object::FileObject;

pub const MANIFEST_FILE: &str = "pmaker-filelist.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Stored")]
pub struct Manifest {
    objects: Vec<FileObject>,
    /// Source paths in `objects`.
    #[serde(skip)]
    seen: HashSet<String>,
}

/// On-disk shape; loading goes through `push` so `seen` is rebuilt.
#[derive(Deserialize)]
struct Stored {
    objects: Vec<FileObject>,
}

impl From<Stored> for Manifest {
    fn from(stored: Stored) -> Self {
        Self::from_objects(stored.objects)
    }
}

/// Objects sharing a parent install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirGroup<'a> {
    /// Assigned in first-seen order, starting at 0.
    pub id: usize,
    pub dir: &'a str,
    pub objects: Vec<&'a FileObject>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `objects`, dropping later duplicates of a source path.
    pub fn from_objects(objects: impl IntoIterator<Item = FileObject>) -> Self {
        let mut manifest = Self::new();
        for obj in objects {
            manifest.push(obj);
        }
        manifest
    }

    /// Append `obj` unless an object with the same source path is already
    /// present. Returns whether it was added.
    pub fn push(&mut self, obj: FileObject) -> bool {
        if !self.seen.insert(obj.path().to_string()) {
            return false;
        }
        self.objects.push(obj);
        true
    }

    pub fn objects(&self) -> &[FileObject] {
        &self.objects
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// `(conflicted, not_conflicted)`, each in manifest order.
    pub fn partition(&self) -> (Vec<&FileObject>, Vec<&FileObject>) {
        self.objects.iter().partition(|o| o.is_conflicted())
    }

    /// Group objects by the parent directory of their install path.
    pub fn dir_groups(&self) -> Vec<DirGroup<'_>> {
        let mut groups: Vec<DirGroup<'_>> = Vec::new();
        for obj in &self.objects {
            let dir = obj.install_dir();
            match groups.iter_mut().find(|g| g.dir == dir) {
                Some(group) => group.objects.push(obj),
                None => {
                    let id = groups.len();
                    groups.push(DirGroup {
                        id,
                        dir,
                        objects: vec![obj],
                    });
                }
            }
        }
        groups
    }

    /// Distinct parent directories of every install path, first-seen order.
    pub fn install_dirs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.objects
            .iter()
            .map(FileObject::install_dir)
            .filter(|d| seen.insert(*d))
            .collect()
    }

    pub fn path_in(workdir: &Path) -> PathBuf {
        workdir.join(MANIFEST_FILE)
    }

    pub fn exists_in(workdir: &Path) -> bool {
        Self::path_in(workdir).is_file()
    }

    pub fn save(&self, workdir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(workdir).map_err(|e| Error::io(workdir, e))?;
        let path = Self::path_in(workdir);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }

    pub fn load(workdir: &Path) -> Result<Self> {
        let path = Self::path_in(workdir);
        let json = fs::read_to_string(&path).map_err(|e| Error::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| Error::Manifest {
            path,
            reason: format!("corrupted: {}", e),
        })
    }
}
