//! Graceful-then-forceful termination ladder
//!
//! Each rung is tried in order: send the signal, then wait a bounded time for
//! the process to be reaped. A rung that cannot deliver its signal or times
//! out hands over to the next one. When every rung fails the process is
//! abandoned so a stuck child never blocks the next generation.

use std::io;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Child handle shared between the supervisor and the exit watcher.
pub(crate) type SharedChild = Arc<Mutex<Child>>;

/// Upper bound for reaping a process after SIGKILL.
pub const KILL_WAIT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub(crate) fn lock_child(child: &SharedChild) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Interrupt,
    Kill,
}

/// The escalation order.
pub const LADDER: [Step; 2] = [Step::Interrupt, Step::Kill];

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Interrupt => "interrupt",
            Step::Kill => "kill",
        }
    }

    fn timeout(&self, grace: Duration) -> Duration {
        match self {
            Step::Interrupt => grace,
            Step::Kill => KILL_WAIT,
        }
    }

    fn send(&self, child: &mut Child) -> io::Result<()> {
        match self {
            Step::Interrupt => interrupt(child),
            Step::Kill => child.kill(),
        }
    }

    fn outcome(&self, status: ExitStatus) -> Termination {
        match self {
            Step::Interrupt => Termination::Interrupted(status),
            Step::Kill => Termination::Killed(status),
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a process was brought down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Gone before the next rung's signal was needed
    Exited(ExitStatus),
    /// Exited after SIGINT
    Interrupted(ExitStatus),
    /// Exited after SIGKILL
    Killed(ExitStatus),
    /// Every rung failed; the process may still be running
    Abandoned { failures: Vec<String> },
}

impl Termination {
    pub fn is_reaped(&self) -> bool {
        !matches!(self, Termination::Abandoned { .. })
    }
}

#[cfg(unix)]
fn interrupt(child: &Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // The child has not been reaped (checked under the same lock), so the pid
    // still names our process.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupt is not supported on this platform",
    ))
}

/// Poll until the child is reaped or `timeout` elapses.
///
/// The lock is held only for each `try_wait`, so the exit watcher keeps
/// making progress too.
pub(crate) fn wait_for_exit(
    child: &SharedChild,
    timeout: Duration,
) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = lock_child(child).try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run the ladder against `child`.
///
/// `on_failure` is called once per failed rung with a human-readable reason.
pub(crate) fn terminate(
    child: &SharedChild,
    grace: Duration,
    mut on_failure: impl FnMut(Step, &str),
) -> Termination {
    let mut failures = Vec::new();

    for step in LADDER {
        let sent = {
            let mut guard = lock_child(child);
            match guard.try_wait() {
                Ok(Some(status)) => return Termination::Exited(status),
                Ok(None) => step.send(&mut guard),
                Err(e) => Err(e),
            }
        };

        let failure = match sent {
            Err(e) => format!("failed to {step} process {}: {e}", pid_of(child)),
            Ok(()) => match wait_for_exit(child, step.timeout(grace)) {
                Ok(Some(status)) => return step.outcome(status),
                Ok(None) => format!(
                    "process {} did not exit within {}ms of {step}",
                    pid_of(child),
                    step.timeout(grace).as_millis()
                ),
                Err(e) => format!("failed to reap process {}: {e}", pid_of(child)),
            },
        };

        on_failure(step, &failure);
        failures.push(failure);
    }

    Termination::Abandoned { failures }
}

fn pid_of(child: &SharedChild) -> u32 {
    lock_child(child).id()
}
