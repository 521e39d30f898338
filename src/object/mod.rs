//! Typed filesystem objects.
//!
//! A [`FileObject`] describes one entry of the package: where it comes from
//! (`path`, never changed after creation), where it is installed
//! (`install_path`), its permissions and owner, its [`FileKind`], a content
//! digest, and, for objects relocated because another package owns their
//! install path, the [`Conflict`] record.
//!
//! Kinds form a closed set. Behaviour that differs per kind (staging copy,
//! materialization) dispatches on the tag in [`copy`].

pub mod copy;
pub mod factory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::listing::AttrValue;

pub use factory::ObjectFactory;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;

/// Kind of a filesystem object, from the POSIX file-type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Dir,
    Symlink,
    /// Character/block device, FIFO or socket.
    Other,
    /// Metadata could not be probed.
    Unknown,
}

impl FileKind {
    /// Classify a full st_mode value.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFLNK => FileKind::Symlink,
            S_IFREG => FileKind::File,
            S_IFDIR => FileKind::Dir,
            _ => FileKind::Other,
        }
    }

    /// Only regular files, directories and symlinks can be packaged.
    pub fn is_copyable(&self) -> bool {
        matches!(self, FileKind::File | FileKind::Dir | FileKind::Symlink)
    }

    /// Default permission bits for an object created from scratch.
    pub fn default_mode(&self) -> u32 {
        match self {
            FileKind::Dir => 0o755,
            FileKind::Symlink => 0o777,
            _ => 0o644,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "f" => Some(FileKind::File),
            "dir" | "directory" | "d" => Some(FileKind::Dir),
            "symlink" | "link" | "l" => Some(FileKind::Symlink),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileKind::File => "file",
            FileKind::Dir => "dir",
            FileKind::Symlink => "symlink",
            FileKind::Other => "other",
            FileKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Another package already owns the install path; the object was moved to
/// the quarantine root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub owner_name: String,
    pub owner_version: String,
    pub owner_release: String,
    /// Install path before relocation.
    pub original_path: String,
    /// Where the owner's original file is preserved.
    pub save_path: String,
}

/// How an object that does not exist yet is to be produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Materialize {
    /// Inline content for a file.
    pub content: Option<String>,
    /// Target of a symlink.
    pub link_target: Option<String>,
    /// Copy content from here instead of `path`.
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    path: String,
    kind: FileKind,
    checksum: String,
    pub install_path: String,
    /// Permission bits only (no file-type bits).
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Packaging-format permission/owner summary, e.g. `%attr(0644, root, root)`.
    #[serde(default)]
    pub format_attr: Option<String>,
    /// Set when the object is produced during staging instead of copied.
    #[serde(default)]
    pub materialize: Option<Materialize>,
    #[serde(default)]
    pub conflict: Option<Conflict>,
}

impl FileObject {
    pub fn new(path: impl Into<String>, kind: FileKind, mode: u32, uid: u32, gid: u32) -> Self {
        let path = path.into();
        Self {
            install_path: path.clone(),
            path,
            kind,
            checksum: cache::sentinel_digest().to_string(),
            mode: mode & 0o7777,
            uid,
            gid,
            format_attr: None,
            materialize: None,
            conflict: None,
        }
    }

    /// An object whose metadata could not be probed.
    pub fn unknown(path: impl Into<String>) -> Self {
        Self::new(path, FileKind::Unknown, 0, 0, 0)
    }

    /// Record the content digest. Only files carry a real digest; for every
    /// other kind this is a no-op.
    pub fn with_checksum(mut self, digest: String) -> Self {
        if self.kind == FileKind::File {
            self.checksum = digest;
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn permission(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn is_copyable(&self) -> bool {
        self.kind.is_copyable()
    }

    pub fn is_conflicted(&self) -> bool {
        self.conflict.is_some()
    }

    /// Marked to be produced during staging rather than copied.
    pub fn is_created(&self) -> bool {
        self.materialize.is_some()
    }

    /// `install_path` without its leading separator.
    pub fn relative_install_path(&self) -> &str {
        self.install_path.trim_start_matches('/')
    }

    /// Location of this object under a staging root.
    pub fn staged_path(&self, root: &Path) -> PathBuf {
        root.join(self.relative_install_path())
    }

    /// Parent directory of `install_path`.
    pub fn install_dir(&self) -> &str {
        match self.install_path.trim_end_matches('/').rsplit_once('/') {
            Some(("", _)) => "/",
            Some((dir, _)) => dir,
            None => ".",
        }
    }

    /// Copy (or materialize) this object to its place under the staging
    /// root and return that place.
    ///
    /// Fails without writing anything if the install path climbs out of
    /// `root` with `..` or if any directory between `root` and the
    /// destination is a symlink, such as one staged earlier in the same run.
    pub fn stage(&self, root: &Path) -> std::io::Result<PathBuf> {
        copy::stage_object(self, root)
    }

    /// Apply one explicit attribute override.
    ///
    /// `path` is immutable and always rejected. `create` and `kind` are only
    /// meaningful when the object is created and are left to the factory.
    pub fn apply_attr(&mut self, key: &str, value: &AttrValue) -> AttrChange {
        match key {
            "path" => AttrChange::Rejected("path is immutable".to_string()),
            "install_path" | "dest" => match value {
                AttrValue::Str(p) if p.starts_with('/') => {
                    changed(&mut self.install_path, p.clone())
                }
                other => AttrChange::Rejected(format!("install path must be absolute, got '{}'", other)),
            },
            "mode" => match value.as_mode() {
                Some(mode) => changed(&mut self.mode, mode),
                None => AttrChange::Rejected(format!("invalid mode '{}'", value)),
            },
            "uid" => match value.as_id() {
                Some(uid) => changed(&mut self.uid, uid),
                None => AttrChange::Rejected(format!("invalid uid '{}'", value)),
            },
            "gid" => match value.as_id() {
                Some(gid) => changed(&mut self.gid, gid),
                None => AttrChange::Rejected(format!("invalid gid '{}'", value)),
            },
            "content" | "link" | "target" | "src" => match self.materialize.as_mut() {
                Some(m) => {
                    let slot = match key {
                        "content" => &mut m.content,
                        "src" => &mut m.source,
                        _ => &mut m.link_target,
                    };
                    changed(slot, Some(value.to_string()))
                }
                None => AttrChange::Rejected(format!("'{}' only applies to created objects", key)),
            },
            "create" | "kind" => AttrChange::Unchanged,
            _ => AttrChange::Rejected(format!("unknown attribute '{}'", key)),
        }
    }
}

/// Outcome of [`FileObject::apply_attr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrChange {
    Changed,
    Unchanged,
    Rejected(String),
}

fn changed<T: PartialEq>(slot: &mut T, value: T) -> AttrChange {
    if *slot == value {
        AttrChange::Unchanged
    } else {
        *slot = value;
        AttrChange::Changed
    }
}
