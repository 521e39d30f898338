//! Preflight command - runs preflight checks.

use anyhow::Result;
use std::path::Path;

use crate::build::BackendRegistry;
use crate::package::Format;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(
    workdir: &Path,
    driver: &str,
    format: Format,
    use_rpmdb: bool,
    mock: bool,
    strict: bool,
) -> Result<()> {
    let registry = BackendRegistry::standard();
    let backend = registry.resolve(driver, format)?;

    if strict {
        preflight::run_preflight_or_fail(backend, workdir, use_rpmdb, mock)?;
        println!("All preflight checks passed!");
    } else {
        let report = preflight::run_preflight(backend, workdir, use_rpmdb, mock);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to exit non-zero.");
        }
    }
    Ok(())
}
