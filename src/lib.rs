//! pmaker: package existing files, directories and symlinks.
//!
//! ```text
//! listing → ObjectFactory → FilterChain → ModifierChain → Manifest
//!         → BuildStateMachine (setup, preconfigure, configure, sbuild, build)
//!         → Backend
//! ```
//!
//! The library exposes every stage for the binary and for integration
//! tests.

pub mod build;
pub mod cache;
pub mod clean;
pub mod collect;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod listing;
pub mod logging;
pub mod manifest;
pub mod modifier;
pub mod object;
pub mod owner;
pub mod package;
pub mod preflight;
pub mod process;
pub mod timing;
pub mod users;

pub use error::{Error, Result};
