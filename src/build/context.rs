//! Build context shared by every step.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::backend::{Invoker, SystemInvoker};
use super::generate::{Generator, ListGenerator};
use super::step::Step;
use crate::manifest::Manifest;
use crate::package::PackageInfo;
use crate::process::Cmd;

pub struct BuildContext {
    /// Work directory: staged tree, markers, persisted manifest.
    pub workdir: PathBuf,
    pub package: PackageInfo,
    /// In memory after a collection run; reloaded from the work directory
    /// otherwise.
    pub manifest: Option<Manifest>,
    /// Build binary rpms in this mock chroot instead of on the host.
    pub mock_root: Option<String>,
    pub generator: Box<dyn Generator>,
    pub invoker: Box<dyn Invoker>,
}

impl BuildContext {
    pub fn new(workdir: &Path, package: PackageInfo) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            package,
            manifest: None,
            mock_root: None,
            generator: Box::new(ListGenerator),
            invoker: Box::new(SystemInvoker),
        }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn with_mock_root(mut self, root: Option<String>) -> Self {
        self.mock_root = root;
        self
    }

    pub fn with_generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_invoker(mut self, invoker: impl Invoker + 'static) -> Self {
        self.invoker = Box::new(invoker);
        self
    }

    /// Root of the staged tree.
    pub fn srcdir(&self) -> PathBuf {
        self.workdir.join("src")
    }

    /// Run `cmd` from the work directory.
    pub fn invoke(&self, step: Step, cmd: Cmd) -> Result<()> {
        self.invoker.invoke(step, cmd.dir(&self.workdir))
    }
}
