//! Hand-off to the packaging-content generator.
//!
//! The preconfigure step computes the manifest's derived views and passes
//! them to a [`Generator`]. Format specific content (spec files, debian
//! control files, Makefiles) belongs to the generator in use; the built-in
//! [`ListGenerator`] writes the plain lists every generator starts from.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::manifest::{DirGroup, Manifest};
use crate::object::FileObject;
use crate::package::PackageInfo;

pub const FILES_LIST: &str = "pmaker-files.list";
pub const CONFLICTS_LIST: &str = "pmaker-conflicts.list";
pub const DIRS_LIST: &str = "pmaker-dirs.list";
/// Package metadata (name, version, summary, license, url, packager) as JSON.
pub const PACKAGE_FILE: &str = "pmaker-package.json";

/// Everything a generator gets to see.
pub struct GenerateInput<'a> {
    pub workdir: &'a Path,
    pub package: &'a PackageInfo,
    pub manifest: &'a Manifest,
    pub conflicted: Vec<&'a FileObject>,
    pub not_conflicted: Vec<&'a FileObject>,
    pub dirs: Vec<DirGroup<'a>>,
}

impl<'a> GenerateInput<'a> {
    pub fn new(workdir: &'a Path, package: &'a PackageInfo, manifest: &'a Manifest) -> Self {
        let (conflicted, not_conflicted) = manifest.partition();
        Self {
            workdir,
            package,
            manifest,
            conflicted,
            not_conflicted,
            dirs: manifest.dir_groups(),
        }
    }
}

pub trait Generator {
    fn generate(&self, input: &GenerateInput<'_>) -> Result<()>;
}

/// Writes the package metadata and the file, conflict and directory lists
/// into the work directory.
#[derive(Debug, Default)]
pub struct ListGenerator;

impl ListGenerator {
    fn files(input: &GenerateInput<'_>) -> String {
        let mut out = String::new();
        for obj in &input.not_conflicted {
            match &obj.format_attr {
                Some(attr) => {
                    let _ = writeln!(out, "{} {}", attr, obj.install_path);
                }
                None => {
                    let _ = writeln!(out, "{}", obj.install_path);
                }
            }
        }
        out
    }

    fn conflicts(input: &GenerateInput<'_>) -> String {
        let mut out = String::new();
        for obj in &input.conflicted {
            if let Some(c) = &obj.conflict {
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}-{}-{}",
                    obj.install_path,
                    c.original_path,
                    c.save_path,
                    c.owner_name,
                    c.owner_version,
                    c.owner_release
                );
            }
        }
        out
    }

    fn dirs(input: &GenerateInput<'_>) -> String {
        let mut out = String::new();
        for group in &input.dirs {
            let _ = writeln!(out, "{}\t{}\t{}", group.id, group.dir, group.objects.len());
        }
        out
    }
}

impl Generator for ListGenerator {
    fn generate(&self, input: &GenerateInput<'_>) -> Result<()> {
        let package = serde_json::to_string_pretty(input.package)
            .context("Failed to serialize package metadata")?;
        for (name, content) in [
            (PACKAGE_FILE, package),
            (FILES_LIST, Self::files(input)),
            (CONFLICTS_LIST, Self::conflicts(input)),
            (DIRS_LIST, Self::dirs(input)),
        ] {
            let path = input.workdir.join(name);
            fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(path = %path.display(), "generated");
        }
        Ok(())
    }
}
