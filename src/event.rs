//! Dev events emitted while watching, building and running
//!
//! Components never print directly. They hand a [`DevEvent`] to an
//! [`EventSink`] and the binary decides how to render it (human lines or
//! NDJSON for CI).

use std::sync::Arc;

use serde::Serialize;

use crate::error::{DevError, Phase};

/// Callback receiving every event. Shared with exit-watcher threads.
pub type EventSink = Arc<dyn Fn(DevEvent) + Send + Sync>;

/// Sink that drops everything.
pub fn null_sink() -> EventSink {
    Arc::new(|_| {})
}

/// Why a supervised process generation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExitReason {
    /// Stopped by godev to make room for a new build
    Restarted,
    /// Stopped by godev during shutdown
    Stopped,
    /// Exited on its own with status 0
    Exited,
    /// Exited on its own with a failure status or signal
    Failed { status: String },
}

/// Events for progress reporting and NDJSON output
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DevEvent {
    WatchStarted {
        root: String,
        target: String,
        directories: usize,
    },
    FileChanged {
        path: String,
    },
    BuildStarted {
        source: String,
    },
    BuildSucceeded {
        artifact: String,
        elapsed_ms: u64,
    },
    BuildFailed {
        message: String,
    },
    ProcessStarted {
        pid: u32,
        artifact: String,
    },
    ProcessTerminating {
        pid: u32,
    },
    ProcessExited {
        pid: u32,
        #[serde(flatten)]
        reason: ExitReason,
    },
    ArtifactRemoved {
        path: String,
    },
    Warning {
        phase: Phase,
        message: String,
    },
    Error {
        phase: Phase,
        message: String,
    },
    Shutdown,
}

impl DevEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn warning(err: &DevError) -> Self {
        DevEvent::Warning {
            phase: err.phase(),
            message: err.to_string(),
        }
    }

    pub fn error(err: &DevError) -> Self {
        DevEvent::Error {
            phase: err.phase(),
            message: err.to_string(),
        }
    }

    /// Events that belong on stderr.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            DevEvent::Warning { .. } | DevEvent::Error { .. } | DevEvent::BuildFailed { .. }
        )
    }
}
