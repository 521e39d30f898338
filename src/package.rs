//! Package identity and output format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packaging format of the produced package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Rpm,
    Deb,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Rpm => "rpm",
            Format::Deb => "deb",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpm" => Ok(Format::Rpm),
            "deb" => Ok(Format::Deb),
            other => Err(format!("unknown package format '{}' (expected rpm or deb)", other)),
        }
    }
}

/// Metadata of the package being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub release: String,
    pub summary: String,
    pub license: String,
    pub url: Option<String>,
    pub packager: String,
    pub email: String,
    pub format: Format,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        let name = name.into();
        Self {
            summary: format!("Custom package of {}", name),
            name,
            version: "0.1".to_string(),
            release: "1".to_string(),
            license: "GPLv2+".to_string(),
            url: None,
            packager: "pmaker".to_string(),
            email: "root@localhost".to_string(),
            format,
        }
    }

    /// `name-version`, the top directory name of source archives.
    pub fn name_version(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}
