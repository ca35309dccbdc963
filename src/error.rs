//! Error types for godev
//!
//! Uses `thiserror` for library errors. Every variant belongs to a [`Phase`]
//! so the operator always sees which step of the cycle failed.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for godev operations
pub type DevResult<T> = Result<T, DevError>;

/// The step of the watch/build/run cycle an error or warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Watch,
    Build,
    Run,
    Terminate,
    Cleanup,
    Config,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Watch => "watch",
            Phase::Build => "build",
            Phase::Run => "run",
            Phase::Terminate => "terminate",
            Phase::Cleanup => "cleanup",
            Phase::Config => "config",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for godev operations
#[derive(Error, Debug)]
pub enum DevError {
    /// Creating the watcher or registering a directory failed (fatal)
    #[error("failed to watch {path}: {source}")]
    WatcherSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The compiler ran and reported failure
    #[error("`{command}` failed: {status}")]
    Build { command: String, status: String },

    /// The compiler could not be started at all
    #[error("could not run `{command}`: {source}")]
    BuildSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The freshly built artifact could not be executed
    #[error("failed to start {path}: {source}")]
    ProcessStart {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither interrupt nor kill brought the old process down
    #[error("process {pid} could not be stopped: {message}")]
    Termination { pid: u32, message: String },

    /// Removing the artifact failed for a reason other than absence
    #[error("failed to remove {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unreadable or invalid configuration file
    #[error("invalid config {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DevError {
    pub fn phase(&self) -> Phase {
        match self {
            DevError::WatcherSetup { .. } => Phase::Watch,
            DevError::Build { .. } | DevError::BuildSpawn { .. } => Phase::Build,
            DevError::ProcessStart { .. } => Phase::Run,
            DevError::Termination { .. } => Phase::Terminate,
            DevError::Cleanup { .. } => Phase::Cleanup,
            DevError::Config { .. } => Phase::Config,
            DevError::Io(_) => Phase::Watch,
        }
    }
}
