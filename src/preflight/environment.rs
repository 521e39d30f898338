//! Work directory checks.

use std::fs;
use std::path::Path;

use super::types::CheckResult;
use crate::build;
use crate::manifest::Manifest;

pub fn check_workdir(workdir: &Path) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let created = !workdir.exists();
    match fs::create_dir_all(workdir) {
        Ok(()) => {
            let probe = workdir.join(".preflight-test");
            match fs::write(&probe, "test") {
                Ok(()) => {
                    let _ = fs::remove_file(&probe);
                    results.push(CheckResult::pass("workdir writable"));
                }
                Err(e) => results.push(CheckResult::fail(
                    "workdir writable",
                    &format!("Cannot write to {}: {}", workdir.display(), e),
                )),
            }
            if created {
                // Leave no trace of a dry check.
                let _ = fs::remove_dir(workdir);
            }
        }
        Err(e) => results.push(CheckResult::fail(
            "workdir writable",
            &format!("Cannot create {}: {}", workdir.display(), e),
        )),
    }

    let done = build::completed_steps(workdir);
    if !done.is_empty() {
        let names: Vec<_> = done.iter().map(|s| s.name()).collect();
        results.push(CheckResult::warn(
            "previous run",
            &format!(
                "steps already done: {} (use --force or `pmaker clean` to redo)",
                names.join(", ")
            ),
        ));
        if !Manifest::exists_in(workdir) {
            results.push(CheckResult::warn(
                "manifest",
                "step markers present but no persisted manifest",
            ));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Step;
    use crate::preflight::types::CheckStatus;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_workdir_passes_and_is_not_left_behind() {
        let dir = TempDir::new().unwrap();
        let workdir = dir.path().join("w");
        let results = check_workdir(&workdir);
        assert_eq!(results, [CheckResult::pass("workdir writable")]);
        assert!(!workdir.exists());
    }

    #[test]
    fn test_previous_run_is_reported() {
        let dir = TempDir::new().unwrap();
        Step::Setup.mark_done(dir.path()).unwrap();
        let results = check_workdir(dir.path());
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].status, CheckStatus::Warn);
        assert!(results[1].details.as_deref().unwrap().contains("setup"));
    }
}
