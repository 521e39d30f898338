//! Preflight checks.
//!
//! Validates host tools and the work directory before a build. Run with
//! `pmaker preflight` to check everything is ready.

mod environment;
mod host_tools;
pub mod types;

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use crate::build::Backend;
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(
    backend: &dyn Backend,
    workdir: &Path,
    use_rpmdb: bool,
    mock: bool,
) -> PreflightReport {
    let mut checks = Vec::new();

    info!("checking host tools");
    checks.extend(host_tools::check_host_tools(backend, use_rpmdb, mock));

    info!("checking work directory");
    checks.extend(environment::check_workdir(workdir));

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(
    backend: &dyn Backend,
    workdir: &Path,
    use_rpmdb: bool,
    mock: bool,
) -> Result<()> {
    let report = run_preflight(backend, workdir, use_rpmdb, mock);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }
    Ok(())
}
