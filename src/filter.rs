//! Exclusion predicates applied before an object reaches the manifest.
//!
//! Filters are OR-ed: the first one that matches drops the object. The chain
//! is ordered cheapest first; order never changes which objects survive.

use std::fs;
use std::path::Path;
use tracing::warn;

use crate::object::{FileKind, FileObject};

pub trait Filter {
    fn name(&self) -> &'static str;

    /// True if `obj` must be excluded.
    fn matches(&self, obj: &FileObject) -> bool;
}

/// Devices, FIFOs, sockets and objects whose metadata could not be probed.
pub struct UnsupportedKind;

impl Filter for UnsupportedKind {
    fn name(&self) -> &'static str {
        "unsupported-kind"
    }

    fn matches(&self, obj: &FileObject) -> bool {
        !obj.is_copyable()
    }
}

/// The source path does not exist and nothing will create it.
pub struct Missing;

impl Filter for Missing {
    fn name(&self) -> &'static str {
        "missing"
    }

    fn matches(&self, obj: &FileObject) -> bool {
        !obj.is_created() && fs::symlink_metadata(obj.path()).is_err()
    }
}

/// The source exists but its content cannot be read.
pub struct Unreadable;

impl Filter for Unreadable {
    fn name(&self) -> &'static str {
        "unreadable"
    }

    fn matches(&self, obj: &FileObject) -> bool {
        if obj.is_created() {
            return false;
        }
        let path = Path::new(obj.path());
        match obj.kind() {
            FileKind::File => fs::File::open(path).is_err(),
            FileKind::Dir => fs::read_dir(path).is_err(),
            FileKind::Symlink => fs::read_link(path).is_err(),
            FileKind::Other | FileKind::Unknown => false,
        }
    }
}

pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl FilterChain {
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty()
            .with(UnsupportedKind)
            .with(Missing)
            .with(Unreadable)
    }

    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Name of the first filter excluding `obj`, if any.
    pub fn excluded_by(&self, obj: &FileObject) -> Option<&'static str> {
        self.filters
            .iter()
            .find(|f| f.matches(obj))
            .map(|f| f.name())
    }

    /// Logs and reports whether `obj` survives the chain.
    pub fn accepts(&self, obj: &FileObject) -> bool {
        match self.excluded_by(obj) {
            Some(filter) => {
                warn!(path = obj.path(), kind = %obj.kind(), filter, "excluded");
                false
            }
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Materialize;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    fn running_as_root() -> bool {
        use std::os::unix::fs::MetadataExt;
        fs::metadata("/proc/self").map(|m| m.uid() == 0).unwrap_or(false)
    }

    #[test]
    fn test_standard_chain_accepts_regular_objects() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        let link = dir.path().join("l");
        symlink("f", &link).unwrap();

        let chain = FilterChain::standard();
        assert_eq!(chain.len(), 3);
        for (path, kind) in [
            (file.as_path(), FileKind::File),
            (dir.path(), FileKind::Dir),
            (link.as_path(), FileKind::Symlink),
        ] {
            let obj = FileObject::new(path.to_str().unwrap(), kind, 0o644, 0, 0);
            assert!(chain.accepts(&obj), "{} rejected", path.display());
        }
    }

    #[test]
    fn test_unsupported_kinds_excluded() {
        let chain = FilterChain::standard();
        let dev = FileObject::new("/dev/null", FileKind::Other, 0o666, 0, 0);
        assert_eq!(chain.excluded_by(&dev), Some("unsupported-kind"));
        let unknown = FileObject::unknown("/root/secret");
        assert_eq!(chain.excluded_by(&unknown), Some("unsupported-kind"));
    }

    #[test]
    fn test_missing_unless_created() {
        let chain = FilterChain::standard();
        let mut obj = FileObject::new("/no/such/file", FileKind::File, 0o644, 0, 0);
        assert_eq!(chain.excluded_by(&obj), Some("missing"));

        obj.materialize = Some(Materialize {
            content: Some("x".into()),
            ..Default::default()
        });
        assert_eq!(chain.excluded_by(&obj), None);
    }

    #[test]
    fn test_unreadable_file_excluded() {
        if running_as_root() {
            // root can read anything
            return;
        }
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("secret");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();

        let obj = FileObject::new(file.to_str().unwrap(), FileKind::File, 0, 0, 0);
        assert_eq!(FilterChain::standard().excluded_by(&obj), Some("unreadable"));
    }

    #[test]
    fn test_dangling_symlink_is_readable() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("dangling");
        symlink("/no/such/target", &link).unwrap();
        let obj = FileObject::new(link.to_str().unwrap(), FileKind::Symlink, 0o777, 0, 0);
        assert!(FilterChain::standard().accepts(&obj));
    }

    #[test]
    fn test_order_does_not_change_outcome() {
        let forward = FilterChain::standard();
        let reverse = FilterChain::empty()
            .with(Unreadable)
            .with(Missing)
            .with(UnsupportedKind);
        let objs = [
            FileObject::new("/dev/null", FileKind::Other, 0o666, 0, 0),
            FileObject::new("/no/such", FileKind::File, 0o644, 0, 0),
            FileObject::new("/", FileKind::Dir, 0o755, 0, 0),
        ];
        for obj in &objs {
            assert_eq!(
                forward.excluded_by(obj).is_some(),
                reverse.excluded_by(obj).is_some()
            );
        }
    }
}
