//! Work directory cleaning.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::build::generate::{CONFLICTS_LIST, DIRS_LIST, FILES_LIST, PACKAGE_FILE};
use crate::build::Step;
use crate::manifest::MANIFEST_FILE;

/// Remove every step marker so the next build runs all steps again.
/// Returns how many markers were removed.
pub fn clean_markers(workdir: &Path) -> Result<usize> {
    let mut removed = 0;
    for step in Step::ALL {
        if step.clear(workdir)? {
            removed += 1;
        }
    }
    info!(workdir = %workdir.display(), removed, "step markers cleared");
    Ok(removed)
}

/// Remove markers, the staged tree, the persisted manifest and generated
/// files. Anything else in the work directory is left alone.
pub fn clean_all(workdir: &Path) -> Result<()> {
    clean_markers(workdir)?;

    let srcdir = workdir.join("src");
    if srcdir.exists() {
        info!("Removing {}...", srcdir.display());
        fs::remove_dir_all(&srcdir)
            .with_context(|| format!("Failed to remove {}", srcdir.display()))?;
    }

    for name in [MANIFEST_FILE, PACKAGE_FILE, FILES_LIST, CONFLICTS_LIST, DIRS_LIST] {
        let path = workdir.join(name);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
