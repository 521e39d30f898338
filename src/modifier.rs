//! Priority-ordered object mutators.
//!
//! Every object that survives the filter chain passes through every
//! modifier, lowest priority first. Ties keep registration order. A modifier
//! only ever looks at the object it is given.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::listing::Target;
use crate::object::{AttrChange, Conflict, FileKind, FileObject};
use crate::owner::OwnershipIndex;
use crate::package::Format;
use crate::users::IdMap;

pub const PRIORITY_ATTR_OVERRIDE: i32 = 0;
pub const PRIORITY_DESTDIR: i32 = 10;
pub const PRIORITY_OWNER_RESET: i32 = 20;
pub const PRIORITY_FORMAT_ATTR: i32 = 30;
pub const PRIORITY_CONFLICT: i32 = 100;

pub trait Modifier {
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32;

    fn update(&self, obj: FileObject, target: Option<&Target>) -> Result<FileObject>;
}

/// Applies the listing's explicit overrides. `path` is never changed.
pub struct AttrOverride;

impl Modifier for AttrOverride {
    fn name(&self) -> &'static str {
        "attr-override"
    }

    fn priority(&self) -> i32 {
        PRIORITY_ATTR_OVERRIDE
    }

    fn update(&self, mut obj: FileObject, target: Option<&Target>) -> Result<FileObject> {
        let Some(target) = target else {
            return Ok(obj);
        };
        for (key, value) in &target.attrs {
            match obj.apply_attr(key, value) {
                AttrChange::Changed => info!(path = obj.path(), attr = %key, %value, "override applied"),
                AttrChange::Unchanged => {}
                AttrChange::Rejected(reason) if key == "path" => {
                    warn!(path = obj.path(), attempted = %value, "ignoring override: {}", reason)
                }
                AttrChange::Rejected(reason) => {
                    debug!(path = obj.path(), attr = %key, "ignoring override: {}", reason)
                }
            }
        }
        Ok(obj)
    }
}

/// Strips a staging prefix from install paths.
pub struct Destdir {
    prefix: String,
}

impl Destdir {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// `install_path` with the prefix removed. The remainder must be an
    /// absolute path, so `/build/rootfs` does not match `/build/root`.
    pub fn rewrite(&self, install_path: &str) -> Option<String> {
        let rest = install_path.strip_prefix(&self.prefix)?;
        rest.starts_with('/').then(|| rest.to_string())
    }
}

impl Modifier for Destdir {
    fn name(&self) -> &'static str {
        "destdir"
    }

    fn priority(&self) -> i32 {
        PRIORITY_DESTDIR
    }

    fn update(&self, mut obj: FileObject, _target: Option<&Target>) -> Result<FileObject> {
        match self.rewrite(&obj.install_path) {
            Some(rewritten) => {
                debug!(path = obj.path(), from = %obj.install_path, to = %rewritten, "destdir stripped");
                obj.install_path = rewritten;
                Ok(obj)
            }
            None => Err(Error::Modifier {
                modifier: self.name(),
                path: obj.install_path.clone(),
                reason: format!("does not start with destdir '{}/'", self.prefix),
            }),
        }
    }
}

/// Forces root ownership.
pub struct OwnerReset;

impl Modifier for OwnerReset {
    fn name(&self) -> &'static str {
        "owner-reset"
    }

    fn priority(&self) -> i32 {
        PRIORITY_OWNER_RESET
    }

    fn update(&self, mut obj: FileObject, _target: Option<&Target>) -> Result<FileObject> {
        if (obj.uid, obj.gid) != (0, 0) {
            info!(path = obj.path(), uid = obj.uid, gid = obj.gid, "ownership reset to root");
            obj.uid = 0;
            obj.gid = 0;
        }
        Ok(obj)
    }
}

/// Packaging-format permission and owner summary.
pub struct FormatAttr<'a> {
    format: Format,
    ids: &'a IdMap,
}

impl<'a> FormatAttr<'a> {
    pub fn new(format: Format, ids: &'a IdMap) -> Self {
        Self { format, ids }
    }

    pub fn render(&self, obj: &FileObject) -> String {
        let user = self.ids.user_name(obj.uid);
        let group = self.ids.group_name(obj.gid);
        match self.format {
            Format::Rpm => {
                let dir = if obj.kind() == FileKind::Dir { "%dir " } else { "" };
                format!("{}%attr({:04o}, {}, {})", dir, obj.permission(), user, group)
            }
            Format::Deb => format!("{:04o} {}:{}", obj.permission(), user, group),
        }
    }
}

impl Modifier for FormatAttr<'_> {
    fn name(&self) -> &'static str {
        "format-attr"
    }

    fn priority(&self) -> i32 {
        PRIORITY_FORMAT_ATTR
    }

    fn update(&self, mut obj: FileObject, _target: Option<&Target>) -> Result<FileObject> {
        obj.format_attr = Some(self.render(&obj));
        Ok(obj)
    }
}

/// Relocates objects whose install path belongs to another package.
pub struct ConflictResolver<'a> {
    index: &'a dyn OwnershipIndex,
    package: String,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(index: &'a dyn OwnershipIndex, package: &str) -> Self {
        Self {
            index,
            package: package.to_string(),
        }
    }
}

/// Where conflicting objects of `package` are installed instead.
pub fn quarantine_root(package: &str) -> String {
    format!("/var/lib/{}-overrides/new", package)
}

/// Where the owning package's originals are preserved.
pub fn preserved_root(package: &str) -> String {
    format!("/var/lib/{}-overrides/saved", package)
}

impl Modifier for ConflictResolver<'_> {
    fn name(&self) -> &'static str {
        "conflict-resolver"
    }

    fn priority(&self) -> i32 {
        PRIORITY_CONFLICT
    }

    fn update(&self, mut obj: FileObject, _target: Option<&Target>) -> Result<FileObject> {
        if obj.is_conflicted() {
            return Ok(obj);
        }
        let owner = match self.index.owner_of(&obj.install_path) {
            Some(owner) if owner.name != self.package => owner,
            _ => return Ok(obj),
        };

        let relative = obj.relative_install_path().to_string();
        let original = std::mem::replace(
            &mut obj.install_path,
            format!("{}/{}", quarantine_root(&self.package), relative),
        );
        let save_path = format!("{}/{}", preserved_root(&self.package), relative);

        warn!(
            path = obj.path(),
            install_path = %original,
            owner = %owner.name,
            relocated = %obj.install_path,
            "install path owned by another package"
        );

        obj.conflict = Some(Conflict {
            owner_name: owner.name,
            owner_version: owner.version,
            owner_release: owner.release,
            original_path: original,
            save_path,
        });
        Ok(obj)
    }
}

/// Modifiers sorted once by `(priority, registration order)`.
pub struct ModifierChain<'a> {
    modifiers: Vec<Box<dyn Modifier + 'a>>,
}

impl<'a> ModifierChain<'a> {
    pub fn new(mut modifiers: Vec<Box<dyn Modifier + 'a>>) -> Self {
        // sort_by_key is stable
        modifiers.sort_by_key(|m| m.priority());
        Self { modifiers }
    }

    /// The chain a collection run uses.
    pub fn standard(options: &ChainOptions<'a>) -> Self {
        let mut modifiers: Vec<Box<dyn Modifier + 'a>> = vec![Box::new(AttrOverride)];
        if let Some(destdir) = options.destdir.as_deref().filter(|d| !d.is_empty()) {
            modifiers.push(Box::new(Destdir::new(destdir)));
        }
        if options.reset_owner {
            modifiers.push(Box::new(OwnerReset));
        }
        modifiers.push(Box::new(FormatAttr::new(options.format, options.ids)));
        if let Some(index) = options.index {
            modifiers.push(Box::new(ConflictResolver::new(index, &options.package)));
        }
        Self::new(modifiers)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modifiers.iter().map(|m| m.name()).collect()
    }

    /// Run `obj` through every modifier in order.
    pub fn apply(&self, obj: FileObject, target: Option<&Target>) -> Result<FileObject> {
        self.modifiers
            .iter()
            .try_fold(obj, |obj, m| m.update(obj, target))
    }
}

/// Inputs for [`ModifierChain::standard`].
pub struct ChainOptions<'a> {
    pub package: String,
    pub format: Format,
    pub destdir: Option<String>,
    pub reset_owner: bool,
    pub ids: &'a IdMap,
    /// Conflict detection is disabled without an index.
    pub index: Option<&'a dyn OwnershipIndex>,
}
