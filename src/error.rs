//! Error taxonomy for submoduler.
//!
//! Only conditions that stop a whole command are represented here. Failures
//! local to one repository are recorded as
//! [`OperationOutcome::Failed`](crate::outcome::OperationOutcome) and never
//! travel through this type past the orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for submoduler operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The working root has no `.submoduler.ini`.
    #[error("Not in a Submoduler directory. Missing {}", path.display())]
    NotInContext { path: PathBuf },

    /// `.submoduler.ini` exists but is unusable.
    #[error("Invalid {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    /// A subprocess could not be started at all.
    #[error("Failed to run {program} in {}: {source}", dir.display())]
    Spawn {
        program: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A subprocess exceeded the configured timeout and was killed.
    #[error("{program} timed out after {}s in {}", timeout.as_secs(), dir.display())]
    TimedOut {
        program: String,
        dir: PathBuf,
        timeout: Duration,
    },

    /// Invalid combination of command options.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
