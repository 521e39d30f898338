//! Preflight check types and report.

use std::fmt::Write as _;

/// Result of a single preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - build will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Human readable report.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Preflight Check Results ===\n\n");

        for check in &self.checks {
            let (icon, status) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
                CheckStatus::Warn => ("⚠", "WARN"),
            };
            let _ = write!(out, "  {} [{}] {}", icon, status, check.name);
            match &check.details {
                Some(details) => {
                    let _ = writeln!(out, ": {}", details);
                }
                None => out.push('\n'),
            }
        }

        let passed = self.count(CheckStatus::Pass);
        let _ = writeln!(out, "\nSummary: {}/{} passed", passed, self.checks.len());
        if self.fail_count() > 0 {
            let _ = writeln!(out, "         {} FAILED - build will not succeed", self.fail_count());
        }
        if self.warn_count() > 0 {
            let _ = writeln!(out, "         {} warnings", self.warn_count());
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}
