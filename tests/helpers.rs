//! Shared test utilities for pmaker tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use pmaker::build::{Invoker, Step};
use pmaker::collect::Collector;
use pmaker::filter::FilterChain;
use pmaker::listing::Target;
use pmaker::manifest::Manifest;
use pmaker::modifier::{ChainOptions, ModifierChain};
use pmaker::object::ObjectFactory;
use pmaker::owner::{OwnedFile, Owner, OwnershipIndex, SnapshotIndex};
use pmaker::package::Format;
use pmaker::process::Cmd;
use pmaker::users::IdMap;

/// Test environment: a fake system tree to collect from and a work
/// directory to build in.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Files to package live here
    pub root: PathBuf,
    pub workdir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("root");
        let workdir = temp_dir.path().join("work");
        fs::create_dir_all(&root).expect("Failed to create root dir");

        Self {
            _temp_dir: temp_dir,
            root,
            workdir,
        }
    }

    /// Absolute path of `rel` under the fake root, as a string.
    pub fn path(&self, rel: &str) -> String {
        self.root.join(rel).display().to_string()
    }

    pub fn write(&self, rel: &str, content: &str) -> String {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    pub fn mkdir(&self, rel: &str) -> String {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).unwrap();
        path.display().to_string()
    }

    pub fn symlink(&self, rel: &str, target: &str) -> String {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        symlink(target, &path).unwrap();
        path.display().to_string()
    }

    /// Write a textual listing file and return its path.
    pub fn listing(&self, lines: &[String]) -> PathBuf {
        let path = self.root.parent().unwrap().join("files.list");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }
}

/// Collect `targets` as package `package` with the standard chains.
pub fn collect(
    targets: &[Target],
    package: &str,
    destdir: Option<&str>,
    index: Option<&dyn OwnershipIndex>,
) -> pmaker::Result<Manifest> {
    let ids = IdMap::default().with_user("root", 0).with_group("root", 0);
    let mut factory = ObjectFactory::new(&ids);
    if let Some(index) = index {
        factory = factory.with_index(index);
    }
    let modifiers = ModifierChain::standard(&ChainOptions {
        package: package.to_string(),
        format: Format::Rpm,
        destdir: destdir.map(str::to_string),
        reset_owner: false,
        ids: &ids,
        index,
    });
    let manifest = Collector::new(factory, FilterChain::standard(), modifiers).run(targets);
    manifest
}

/// Index in which `owner` owns each of `paths`.
pub fn index_owning(paths: &[&str], owner: &str) -> SnapshotIndex {
    let mut files = BTreeMap::new();
    for path in paths {
        files.insert(
            path.to_string(),
            OwnedFile {
                owner: Owner {
                    name: owner.to_string(),
                    version: "2.13.7".to_string(),
                    release: "9.el9".to_string(),
                    arch: "noarch".to_string(),
                    epoch: None,
                },
                mode: None,
                user: None,
                group: None,
            },
        );
    }
    SnapshotIndex::from_entries(files)
}

/// Records delegated invocations instead of running them; optionally fails
/// at one step.
#[derive(Clone, Default)]
pub struct RecordingInvoker {
    pub calls: Rc<RefCell<Vec<(Step, String)>>>,
    pub fail_at: Option<Step>,
}

impl RecordingInvoker {
    pub fn failing_at(step: Step) -> Self {
        Self {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls.borrow().iter().map(|(s, _)| *s).collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
    }
}

impl Invoker for RecordingInvoker {
    fn invoke(&self, step: Step, cmd: Cmd) -> anyhow::Result<()> {
        self.calls.borrow_mut().push((step, cmd.describe()));
        if self.fail_at == Some(step) {
            anyhow::bail!("simulated failure in {}", step);
        }
        Ok(())
    }
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
