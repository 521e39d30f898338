//! Clean command - resets the work directory.

use anyhow::Result;
use std::path::Path;

use crate::clean;

/// Clean target for the clean command.
pub enum CleanTarget {
    /// Step markers only (default): the next build redoes every step
    Markers,
    /// Markers, staged tree, manifest and generated lists
    All,
}

/// Execute the clean command.
pub fn cmd_clean(workdir: &Path, target: CleanTarget) -> Result<()> {
    if !workdir.exists() {
        println!("Nothing to clean: {} does not exist.", workdir.display());
        return Ok(());
    }
    match target {
        CleanTarget::Markers => {
            let removed = clean::clean_markers(workdir)?;
            println!("Removed {} step marker(s).", removed);
        }
        CleanTarget::All => {
            clean::clean_all(workdir)?;
            println!("Work directory {} cleaned.", workdir.display());
        }
    }
    Ok(())
}
