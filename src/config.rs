//! Configuration management for pmaker.
//!
//! Reads configuration from a `.env` file and environment variables.
//! Environment variables take precedence over the `.env` file; command line
//! flags take precedence over both.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::package::Format;

pub const DEFAULT_WORKDIR: &str = "pmaker-workdir";
pub const DEFAULT_DRIVER: &str = "autotools";
pub const DEFAULT_CACHE_EXPIRES_DAYS: u64 = 1;
const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory (PMAKER_WORKDIR, default: ./pmaker-workdir)
    pub workdir: PathBuf,
    /// Package format (PMAKER_FORMAT, default: rpm)
    pub format: Format,
    /// Build strategy (PMAKER_DRIVER, default: autotools)
    pub driver: String,
    /// Package index snapshots live here (PMAKER_CACHE_DIR)
    pub cache_dir: PathBuf,
    /// Snapshot expiry (PMAKER_CACHE_EXPIRES, in days)
    pub cache_expires: Duration,
    pub packager: Option<String>,
    pub email: Option<String>,
}

impl Config {
    /// Load configuration from `base_dir/.env` and the environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            match dotenvy::from_path_iter(&env_path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                vars.insert(key, value);
                            }
                            Err(e) => warn!(path = %env_path.display(), "skipping .env entry: {}", e),
                        }
                    }
                }
                Err(e) => warn!(path = %env_path.display(), "cannot read .env: {}", e),
            }
        }

        // Environment variables override .env file
        vars.extend(std::env::vars());

        Self::from_vars(base_dir, &vars)
    }

    /// Build a config from an explicit variable map.
    pub fn from_vars(base_dir: &Path, vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).map(|s| s.trim()).filter(|s| !s.is_empty());

        let workdir = get("PMAKER_WORKDIR")
            .map(|s| absolutize(base_dir, s))
            .unwrap_or_else(|| base_dir.join(DEFAULT_WORKDIR));

        let format = match get("PMAKER_FORMAT").map(str::parse::<Format>) {
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                warn!("PMAKER_FORMAT ignored: {}", e);
                Format::Rpm
            }
            None => Format::Rpm,
        };

        let cache_dir = get("PMAKER_CACHE_DIR")
            .map(|s| absolutize(base_dir, s))
            .unwrap_or_else(|| {
                dirs::cache_dir()
                    .unwrap_or_else(|| base_dir.join(".cache"))
                    .join("pmaker")
            });

        let days = match get("PMAKER_CACHE_EXPIRES").map(str::parse::<u64>) {
            Some(Ok(days)) => days,
            Some(Err(e)) => {
                warn!("PMAKER_CACHE_EXPIRES ignored: {}", e);
                DEFAULT_CACHE_EXPIRES_DAYS
            }
            None => DEFAULT_CACHE_EXPIRES_DAYS,
        };

        Self {
            workdir,
            format,
            driver: get("PMAKER_DRIVER").unwrap_or(DEFAULT_DRIVER).to_string(),
            cache_dir,
            cache_expires: Duration::from_secs(days.saturating_mul(SECS_PER_DAY)),
            packager: get("PMAKER_PACKAGER").map(str::to_string),
            email: get("PMAKER_EMAIL").map(str::to_string),
        }
    }

    /// Location of the package index snapshot.
    pub fn rpmdb_snapshot(&self) -> PathBuf {
        self.cache_dir.join("rpmdb.json")
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  PMAKER_WORKDIR: {}", self.workdir.display());
        println!("  PMAKER_FORMAT: {}", self.format);
        println!("  PMAKER_DRIVER: {}", self.driver);
        println!("  PMAKER_CACHE_DIR: {}", self.cache_dir.display());
        println!(
            "  PMAKER_CACHE_EXPIRES: {} day(s)",
            self.cache_expires.as_secs() / 86400
        );
        if let Some(packager) = &self.packager {
            println!("  PMAKER_PACKAGER: {}", packager);
        }
        if let Some(email) = &self.email {
            println!("  PMAKER_EMAIL: {}", email);
        }
    }
}

fn absolutize(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
