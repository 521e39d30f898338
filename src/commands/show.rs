//! Show command - displays information.

use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

use crate::build::{self, Step};
use crate::config::Config;
use crate::manifest::Manifest;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show step markers and manifest summary of a work directory
    Status,
}

/// Execute the show command.
pub fn cmd_show(workdir: &Path, target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Status => print_status(workdir)?,
    }
    Ok(())
}

fn print_status(workdir: &Path) -> Result<()> {
    println!("Work directory: {}", workdir.display());
    let done = build::completed_steps(workdir);
    for step in Step::ALL {
        let mark = if done.contains(&step) { "done" } else { "pending" };
        println!("  {:<13} {}", step.name(), mark);
    }

    if Manifest::exists_in(workdir) {
        let manifest = Manifest::load(workdir)?;
        let (conflicted, _) = manifest.partition();
        println!(
            "Manifest: {} object(s), {} conflict(s), {} directories",
            manifest.len(),
            conflicted.len(),
            manifest.install_dirs().len()
        );
    } else {
        println!("Manifest: not collected yet");
    }

    let srcdir = workdir.join("src");
    if srcdir.exists() {
        let staged = WalkDir::new(&srcdir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .count();
        println!("Staged entries: {}", staged);
    }
    Ok(())
}
