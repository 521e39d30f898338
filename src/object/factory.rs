//! Build one [`FileObject`] per listing [`Target`].
//!
//! Metadata comes from, in order:
//! 1. the package ownership index, if enabled and it has a record for the
//!    path (recorded mode/owner win over the live filesystem),
//! 2. `lstat` of the path.
//!
//! A failed probe gives an `Unknown` object; the filter chain drops it later.
//! Objects that are asked to be created and don't exist yet are never
//! probed.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tracing::{debug, warn};

use super::{FileKind, FileObject, Materialize};
use crate::cache::{self, ChecksumCache};
use crate::listing::{AttrValue, Attrs, Target};
use crate::owner::{OwnedFile, OwnershipIndex};
use crate::users::IdMap;

pub struct ObjectFactory<'a> {
    index: Option<&'a dyn OwnershipIndex>,
    ids: &'a IdMap,
    checksums: ChecksumCache,
}

impl<'a> ObjectFactory<'a> {
    pub fn new(ids: &'a IdMap) -> Self {
        Self {
            index: None,
            ids,
            checksums: ChecksumCache::new(),
        }
    }

    pub fn with_index(mut self, index: &'a dyn OwnershipIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Create the object for `target`.
    ///
    /// `attrs` decide whether the object is created rather than probed, and
    /// supply what creation needs (`content`, `link`, `src`, `kind`). Field
    /// overrides such as `mode` or `install_path` are left to the
    /// attr-override modifier. `use_index` enables the ownership index as
    /// metadata source.
    pub fn create(&mut self, target: &Target, use_index: bool, attrs: &Attrs) -> FileObject {
        let path = target.path.as_str();
        let exists = fs::symlink_metadata(path).is_ok();

        if wants_creation(path, attrs) && !exists {
            self.create_new(path, attrs)
        } else {
            self.probe(path, use_index)
        }
    }

    fn probe(&mut self, path: &str, use_index: bool) -> FileObject {
        if use_index {
            if let Some(record) = self.index.and_then(|index| index.find(path)) {
                if let Some(obj) = self.from_record(path, &record) {
                    debug!(path, owner = %record.owner.name, "metadata from package index");
                    return obj;
                }
            }
        }

        match fs::symlink_metadata(path) {
            Ok(meta) => {
                let kind = FileKind::from_mode(meta.mode());
                let obj = FileObject::new(path, kind, meta.mode(), meta.uid(), meta.gid());
                self.with_digest(obj)
            }
            Err(e) => {
                debug!(path, error = %e, "probe failed");
                FileObject::unknown(path)
            }
        }
    }

    fn from_record(&mut self, path: &str, record: &OwnedFile) -> Option<FileObject> {
        let mode = record.mode?;
        let uid = record
            .user
            .as_deref()
            .and_then(|u| self.ids.uid(u))
            .unwrap_or(0);
        let gid = record
            .group
            .as_deref()
            .and_then(|g| self.ids.gid(g))
            .unwrap_or(0);
        let obj = FileObject::new(path, FileKind::from_mode(mode), mode, uid, gid);
        Some(self.with_digest(obj))
    }

    fn create_new(&mut self, path: &str, attrs: &Attrs) -> FileObject {
        let text = |key: &str| attrs.get(key).map(AttrValue::to_string);
        let materialize = Materialize {
            content: text("content"),
            link_target: text("link").or_else(|| text("target")),
            source: text("src").filter(|s| s != path),
        };

        let source_meta = materialize
            .source
            .as_deref()
            .and_then(|s| fs::symlink_metadata(s).ok());

        let kind = attrs
            .get("kind")
            .and_then(|k| FileKind::parse(&k.to_string()))
            .or_else(|| materialize.link_target.as_ref().map(|_| FileKind::Symlink))
            .or_else(|| source_meta.as_ref().map(|m| FileKind::from_mode(m.mode())))
            .unwrap_or(FileKind::File);

        let mode = source_meta
            .as_ref()
            .filter(|m| FileKind::from_mode(m.mode()) == kind)
            .map(|m| m.mode())
            .unwrap_or_else(|| kind.default_mode());

        let digest = match (&materialize.content, &materialize.source) {
            (Some(content), _) => Some(cache::digest_bytes(content.as_bytes())),
            (None, Some(source)) if kind == FileKind::File => {
                self.checksums.digest(Path::new(source)).ok()
            }
            _ => None,
        };

        debug!(path, %kind, "object will be created during staging");
        let mut obj = FileObject::new(path, kind, mode, 0, 0);
        if let Some(digest) = digest {
            obj = obj.with_checksum(digest);
        }
        obj.materialize = Some(materialize);
        obj
    }

    fn with_digest(&mut self, obj: FileObject) -> FileObject {
        if obj.kind() != FileKind::File {
            return obj;
        }
        match self.checksums.digest(Path::new(obj.path())) {
            Ok(digest) => obj.with_checksum(digest),
            Err(e) => {
                warn!(path = obj.path(), error = %e, "cannot read file content");
                obj
            }
        }
    }
}

/// The listing asks for the object to be produced rather than collected.
fn wants_creation(path: &str, attrs: &Attrs) -> bool {
    attrs.get("create").is_some_and(AttrValue::as_bool)
        || attrs.contains_key("content")
        || attrs.contains_key("link")
        || attrs.contains_key("target")
        || attrs
            .get("src")
            .is_some_and(|src| src.to_string() != path)
}
