//! Supervised process generation: spawning and exit monitoring

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use crate::error::{DevError, DevResult, Phase};
use crate::event::{DevEvent, EventSink, ExitReason};

use super::terminate::{lock_child, SharedChild};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why godev itself stopped a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Restart,
    Shutdown,
}

/// The one running program, owned by the supervisor.
#[derive(Debug)]
pub(crate) struct SupervisedProcess {
    pub(crate) child: SharedChild,
    pub(crate) pid: u32,
    /// Set before the process is signaled; read only by the exit watcher.
    pub(crate) stop_cause: Arc<OnceLock<StopCause>>,
}

/// Start `artifact` with stdout/stderr wired to the operator's own.
pub(crate) fn spawn(
    artifact: &Path,
    args: &[String],
    workdir: Option<&Path>,
) -> DevResult<SupervisedProcess> {
    let mut command = Command::new(artifact);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|source| DevError::ProcessStart {
        path: artifact.to_path_buf(),
        source,
    })?;

    Ok(SupervisedProcess {
        pid: child.id(),
        child: Arc::new(Mutex::new(child)),
        stop_cause: Arc::new(OnceLock::new()),
    })
}

/// Detach a thread that reports how this generation ended.
///
/// The watcher only emits an event; it never touches supervisor state and
/// nobody joins it. Once `running` is cleared, an exit nobody requested is
/// still reported as a shutdown stop: a terminal Ctrl+C reaches the whole
/// process group before godev gets to stop the program itself.
pub(crate) fn watch_exit(
    process: &SupervisedProcess,
    running: Arc<AtomicBool>,
    sink: EventSink,
) -> std::io::Result<()> {
    let child = Arc::clone(&process.child);
    let stop_cause = Arc::clone(&process.stop_cause);
    let pid = process.pid;

    thread::Builder::new()
        .name(format!("godev-exit-{pid}"))
        .spawn(move || loop {
            let polled = lock_child(&child).try_wait();
            match polled {
                Ok(Some(status)) => {
                    let cause = stop_cause
                        .get()
                        .copied()
                        .or_else(|| shutdown_cause(status, &running));
                    sink(DevEvent::ProcessExited {
                        pid,
                        reason: classify(status, cause),
                    });
                    return;
                }
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    sink(DevEvent::Warning {
                        phase: Phase::Run,
                        message: format!("lost track of process {pid}: {e}"),
                    });
                    return;
                }
            }
        })
        .map(|_| ())
}

/// `Shutdown` if the exit coincides with godev shutting down.
///
/// The signal handler runs on its own thread and may clear `running` a
/// moment after the program died from the same signal, so a failed exit
/// gets one more poll interval before it counts as a failure.
fn shutdown_cause(status: ExitStatus, running: &AtomicBool) -> Option<StopCause> {
    if running.load(Ordering::SeqCst) && !status.success() {
        thread::sleep(EXIT_POLL_INTERVAL);
    }
    (!running.load(Ordering::SeqCst)).then_some(StopCause::Shutdown)
}

pub(crate) fn classify(status: ExitStatus, cause: Option<StopCause>) -> ExitReason {
    match cause {
        Some(StopCause::Restart) => ExitReason::Restarted,
        Some(StopCause::Shutdown) => ExitReason::Stopped,
        None if status.success() => ExitReason::Exited,
        None => ExitReason::Failed {
            status: status.to_string(),
        },
    }
}
