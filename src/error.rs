//! Typed errors for the collection pipeline and the build state machine.
//!
//! Only fatal conditions are represented here. Probe failures, filter
//! exclusions and ownership lookup failures are logged and absorbed where
//! they happen.

use std::path::PathBuf;

use thiserror::Error;

use crate::build::step::Step;
use crate::package::Format;

/// Convenience alias used across the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A listing entry or record could not be parsed.
    #[error("listing error at {location}: {reason}: {entry:?}")]
    Listing {
        location: String,
        entry: String,
        reason: String,
    },

    /// A modifier refused an object; aborts the whole collection run.
    #[error("modifier '{modifier}' failed for {path}: {reason}")]
    Modifier {
        modifier: &'static str,
        path: String,
        reason: String,
    },

    /// No backend is registered for the requested strategy/format pair.
    #[error("no backend registered for strategy '{strategy}' and format '{format}'")]
    UnknownBackend { strategy: String, format: Format },

    /// A build step failed; its marker was not written.
    #[error("step '{step}' failed")]
    Step {
        step: Step,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The persisted manifest is missing or unreadable.
    #[error("manifest not available at {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn listing(location: impl Into<String>, entry: &str, reason: impl Into<String>) -> Self {
        Self::Listing {
            location: location.into(),
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn step(step: Step, source: anyhow::Error) -> Self {
        Self::Step {
            step,
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
