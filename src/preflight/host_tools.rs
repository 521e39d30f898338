//! Host tool availability checks.

use super::types::CheckResult;
use crate::build::Backend;

/// Check the tools `backend` needs, plus the optional ones used around it.
pub fn check_host_tools(backend: &dyn Backend, use_rpmdb: bool, mock: bool) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = backend
        .required_tools()
        .into_iter()
        .map(|tool| {
            check_tool_exists(
                tool,
                &format!("Required by the {} backend", backend.strategy()),
                true,
            )
        })
        .collect();

    if use_rpmdb {
        results.push(check_tool_exists(
            "rpm",
            "Used to detect files owned by installed packages",
            false,
        ));
    }
    if mock {
        results.push(check_tool_exists("mock", "Required for --mock-root builds", true));
    }
    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, purpose: &str, required: bool) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) => {
            let msg = format!("Not found in PATH. {}", purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
