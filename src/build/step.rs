//! The five build steps and their on-disk markers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Setup,
    Preconfigure,
    Configure,
    Sbuild,
    Build,
}

impl Step {
    /// Every step, in execution order.
    pub const ALL: [Step; 5] = [
        Step::Setup,
        Step::Preconfigure,
        Step::Configure,
        Step::Sbuild,
        Step::Build,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Setup => "setup",
            Step::Preconfigure => "preconfigure",
            Step::Configure => "configure",
            Step::Sbuild => "sbuild",
            Step::Build => "build",
        }
    }

    pub fn progress_message(&self) -> &'static str {
        match self {
            Step::Setup => "Setting up src tree",
            Step::Preconfigure => "Making up autotool-ized src directory",
            Step::Configure => "Configuring src distribution",
            Step::Sbuild => "Building src package",
            Step::Build => "Building bin packages",
        }
    }

    pub fn marker_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(format!("pmaker-{}.stamp", self.name()))
    }

    pub fn is_done(&self, workdir: &Path) -> bool {
        self.marker_path(workdir).exists()
    }

    pub fn mark_done(&self, workdir: &Path) -> Result<()> {
        let path = self.marker_path(workdir);
        fs::write(&path, format!("{}\n", self.progress_message())).map_err(|e| Error::io(&path, e))
    }

    /// Remove the marker; a missing marker is fine.
    pub fn clear(&self, workdir: &Path) -> Result<bool> {
        let path = self.marker_path(workdir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Step::ALL.iter().map(Step::name).collect();
                format!("unknown step '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_order_and_names() {
        let names: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["setup", "preconfigure", "configure", "sbuild", "build"]);
        assert!(Step::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("sbuild".parse::<Step>().unwrap(), Step::Sbuild);
        assert_eq!("Configure".parse::<Step>().unwrap(), Step::Configure);
        assert!("install".parse::<Step>().is_err());
    }

    #[test]
    fn test_markers() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            Step::Configure.marker_path(dir.path()),
            dir.path().join("pmaker-configure.stamp")
        );
        assert!(!Step::Configure.is_done(dir.path()));
        Step::Configure.mark_done(dir.path()).unwrap();
        assert!(Step::Configure.is_done(dir.path()));
        assert!(Step::Configure.clear(dir.path()).unwrap());
        assert!(!Step::Configure.clear(dir.path()).unwrap());
    }
}
