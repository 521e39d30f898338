//! Package ownership index.
//!
//! Answers "which installed package owns this path, and what mode/owner did
//! it record for it". Backed either by live `rpm` queries ([`RpmDb`]) or by a
//! cached snapshot of the whole database ([`SnapshotIndex`]).
//!
//! Lookup failures never abort collection: [`OwnershipIndex::find`] logs them
//! and reports "no owner".

pub mod rpm;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::warn;

pub use rpm::RpmDb;
pub use snapshot::SnapshotIndex;

/// Identity of an installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub epoch: Option<String>,
}

/// A path as recorded by the package database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedFile {
    pub owner: Owner,
    /// Full st_mode including file-type bits.
    pub mode: Option<u32>,
    pub user: Option<String>,
    pub group: Option<String>,
}

pub trait OwnershipIndex {
    /// Look up `path`. `Ok(None)` means no package owns it.
    fn lookup(&self, path: &str) -> anyhow::Result<Option<OwnedFile>>;

    /// Like [`lookup`](Self::lookup), with failures logged and treated as
    /// "no owner".
    fn find(&self, path: &str) -> Option<OwnedFile> {
        match self.lookup(path) {
            Ok(found) => found,
            Err(e) => {
                warn!(path, "ownership lookup failed, assuming no owner: {:#}", e);
                None
            }
        }
    }

    fn owner_of(&self, path: &str) -> Option<Owner> {
        self.find(path).map(|f| f.owner)
    }
}

impl<T: OwnershipIndex + ?Sized> OwnershipIndex for &T {
    fn lookup(&self, path: &str) -> anyhow::Result<Option<OwnedFile>> {
        (**self).lookup(path)
    }
}

/// Explicit memo in front of any index.
///
/// Both the object factory and the conflict resolver ask about the same
/// paths; live queries are slow, so answers are kept per run. Errors are
/// not cached.
pub struct OwnerCache<I> {
    inner: I,
    memo: RefCell<HashMap<String, Option<OwnedFile>>>,
}

impl<I: OwnershipIndex> OwnerCache<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.memo.borrow().len()
    }
}

impl<I: OwnershipIndex> OwnershipIndex for OwnerCache<I> {
    fn lookup(&self, path: &str) -> anyhow::Result<Option<OwnedFile>> {
        if let Some(hit) = self.memo.borrow().get(path) {
            return Ok(hit.clone());
        }
        let found = self.inner.lookup(path)?;
        self.memo
            .borrow_mut()
            .insert(path.to_string(), found.clone());
        Ok(found)
    }
}
