//! Process Supervisor
//!
//! Owns the lifecycle of at most one running child:
//! - `replace` stops the current process (interrupt, then kill) and starts a
//!   new one from a freshly built artifact
//! - `terminate_all` stops the current process at shutdown
//!
//! Both hold one lock for their whole duration, so no two lifecycle
//! transitions ever interleave. A rebuild that arrives while a previous
//! `replace` is still tearing down waits for the lock.

mod process;
mod terminate;


use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{DevError, DevResult, Phase};
use crate::event::{DevEvent, EventSink};

use process::SupervisedProcess;

pub use process::StopCause;
pub use terminate::{Step, Termination, KILL_WAIT, LADDER};

/// Default time a process gets to exit after SIGINT
pub const DEFAULT_GRACE_MS: u64 = 2000;

/// How supervised processes are launched and stopped.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Arguments passed to every generation
    pub args: Vec<String>,
    /// Wait after SIGINT before escalating to SIGKILL
    pub grace: Duration,
    /// Working directory for the program (inherits godev's when `None`)
    pub workdir: Option<PathBuf>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            workdir: None,
        }
    }
}

pub struct ProcessSupervisor {
    options: SupervisorOptions,
    current: Mutex<Option<SupervisedProcess>>,
    running: Arc<AtomicBool>,
    sink: EventSink,
}

impl ProcessSupervisor {
    pub fn new(options: SupervisorOptions, sink: EventSink) -> Self {
        Self {
            options,
            current: Mutex::new(None),
            running: Arc::new(AtomicBool::new(true)),
            sink,
        }
    }

    /// Share the session's shutdown flag, so programs that die from the
    /// same signal that stops godev are reported as stopped.
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Stop the current process, if any, and start `artifact` in its place.
    ///
    /// Returns the new pid. A start failure leaves no process supervised but
    /// the supervisor stays usable for the next call.
    pub fn replace(&self, artifact: &Path) -> DevResult<u32> {
        let mut current = self.lock_current();

        if let Some(old) = current.take() {
            self.stop(old, StopCause::Restart);
        }

        let process =
            process::spawn(artifact, &self.options.args, self.options.workdir.as_deref())?;
        let pid = process.pid;

        (self.sink)(DevEvent::ProcessStarted {
            pid,
            artifact: artifact.display().to_string(),
        });

        let watched = process::watch_exit(&process, Arc::clone(&self.running), self.sink.clone());
        if let Err(e) = watched {
            (self.sink)(DevEvent::Warning {
                phase: Phase::Run,
                message: format!("cannot monitor process {pid}: {e}"),
            });
        }

        *current = Some(process);
        Ok(pid)
    }

    /// Stop the current process without starting a replacement.
    pub fn terminate_all(&self) -> Option<Termination> {
        let mut current = self.lock_current();
        current
            .take()
            .map(|process| self.stop(process, StopCause::Shutdown))
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.lock_current().as_ref().map(|p| p.pid)
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<SupervisedProcess>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self, process: SupervisedProcess, cause: StopCause) -> Termination {
        let pid = process.pid;
        // Only the first cause counts; a process is stopped at most once.
        let _ = process.stop_cause.set(cause);

        (self.sink)(DevEvent::ProcessTerminating { pid });

        let outcome = terminate::terminate(&process.child, self.options.grace, |_, message| {
            (self.sink)(DevEvent::Warning {
                phase: Phase::Terminate,
                message: message.to_string(),
            });
        });

        if let Termination::Abandoned { failures } = &outcome {
            let err = DevError::Termination {
                pid,
                message: failures.join("; "),
            };
            (self.sink)(DevEvent::error(&err));
        }

        outcome
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        // Never leave an orphan behind, even on an early return
        self.terminate_all();
    }
}
