//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Collect a listing and run the build steps
//! - `clean` - Clean the work directory
//! - `show` - Display configuration and build status
//! - `preflight` - Run preflight checks

pub mod build;
pub mod clean;
mod preflight;
pub mod show;

pub use build::{cmd_build, cmd_collect, BuildOptions};
pub use clean::cmd_clean;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
