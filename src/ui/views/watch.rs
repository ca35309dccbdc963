use std::io::Write;
use std::sync::Arc;

use godev::{DevEvent, EventSink, ExitReason};

use crate::ui::context::UiContext;
use crate::ui::primitives::icon::Icon;

pub fn render_watch_header(target: &str, supports_color: bool, supports_unicode: bool) -> String {
    format!(
        "{} godev: {} (Press Ctrl+C to stop)\n",
        Icon::Watch.colored(supports_color, supports_unicode),
        target
    )
}

pub fn render_dev_event(
    timestamp: &str,
    event: &DevEvent,
    supports_color: bool,
    supports_unicode: bool,
) -> String {
    let prefix = format!("[{}]", timestamp);
    let icon = |icon: Icon| icon.colored(supports_color, supports_unicode);

    match event {
        DevEvent::WatchStarted {
            root, directories, ..
        } => format!(
            "{} {} Watching: {} ({} {})\n",
            prefix,
            icon(Icon::Watch),
            root,
            directories,
            if *directories == 1 {
                "directory"
            } else {
                "directories"
            }
        ),
        DevEvent::FileChanged { path } => {
            format!("{} {} Changed: {}\n", prefix, icon(Icon::Arrow), path)
        }
        DevEvent::BuildStarted { source } => {
            format!("{} {} Building {}...\n", prefix, icon(Icon::Progress), source)
        }
        DevEvent::BuildSucceeded {
            artifact,
            elapsed_ms,
        } => format!(
            "{} {} Built {} in {}ms\n",
            prefix,
            icon(Icon::Success),
            artifact,
            elapsed_ms
        ),
        DevEvent::BuildFailed { message } => {
            format!("{} {} Build failed: {}\n", prefix, icon(Icon::Error), message)
        }
        DevEvent::ProcessStarted { pid, artifact } => format!(
            "{} {} Running {} (pid {})\n",
            prefix,
            icon(Icon::Run),
            artifact,
            pid
        ),
        DevEvent::ProcessTerminating { pid } => format!(
            "{} {} Stopping previous program (pid {})\n",
            prefix,
            icon(Icon::Stop),
            pid
        ),
        DevEvent::ProcessExited { pid, reason } => match reason {
            ExitReason::Restarted => format!(
                "{} {} Program stopped for rebuild (pid {})\n",
                prefix,
                icon(Icon::Stop),
                pid
            ),
            ExitReason::Stopped => format!(
                "{} {} Program stopped (pid {})\n",
                prefix,
                icon(Icon::Stop),
                pid
            ),
            ExitReason::Exited => format!(
                "{} {} Program exited (pid {})\n",
                prefix,
                icon(Icon::Success),
                pid
            ),
            ExitReason::Failed { status } => format!(
                "{} {} Program exited with {} (pid {})\n",
                prefix,
                icon(Icon::Warning),
                status,
                pid
            ),
        },
        DevEvent::ArtifactRemoved { path } => {
            format!("{} {} Removed: {}\n", prefix, icon(Icon::Trash), path)
        }
        DevEvent::Warning { phase, message } => format!(
            "{} {} {}: {}\n",
            prefix,
            icon(Icon::Warning),
            phase,
            message
        ),
        DevEvent::Error { phase, message } => format!(
            "{} {} {} error: {}\n",
            prefix,
            icon(Icon::Error),
            phase,
            message
        ),
        DevEvent::Shutdown => format!("\n{} {} Watch stopped.\n", prefix, icon(Icon::Watch)),
    }
}

/// Sink that prints every event, as NDJSON or as a timestamped line.
///
/// In human mode problems go to stderr; NDJSON always goes to stdout.
pub fn event_sink(ui: UiContext) -> EventSink {
    Arc::new(move |event: DevEvent| {
        if ui.json {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", event.to_json());
            let _ = out.flush();
            return;
        }

        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        let line = render_dev_event(&timestamp, &event, ui.color, ui.unicode);
        if event.is_problem() {
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(line.as_bytes());
        } else {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(line.as_bytes());
            let _ = out.flush();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use godev::Phase;

    fn plain(event: DevEvent) -> String {
        render_dev_event("12:00:00", &event, false, false)
    }

    #[test]
    fn renders_header_with_target() {
        let rendered = render_watch_header("main.go", false, false);
        assert_eq!(rendered, "[~] godev: main.go (Press Ctrl+C to stop)\n");
    }

    #[test]
    fn renders_started_event_with_watch_icon() {
        let rendered = plain(DevEvent::WatchStarted {
            root: "/src/app".to_string(),
            target: "main.go".to_string(),
            directories: 3,
        });
        insta::assert_snapshot!(
            rendered.trim_end(),
            @"[12:00:00] [~] Watching: /src/app (3 directories)"
        );
    }

    #[test]
    fn renders_single_directory() {
        let rendered = plain(DevEvent::WatchStarted {
            root: ".".to_string(),
            target: "main.go".to_string(),
            directories: 1,
        });
        assert!(rendered.contains("(1 directory)"));
    }

    #[test]
    fn renders_build_cycle() {
        let rendered = [
            DevEvent::FileChanged {
                path: "handlers/user.go".to_string(),
            },
            DevEvent::BuildStarted {
                source: "main.go".to_string(),
            },
            DevEvent::BuildSucceeded {
                artifact: "main".to_string(),
                elapsed_ms: 420,
            },
            DevEvent::ProcessStarted {
                pid: 4242,
                artifact: "main".to_string(),
            },
        ]
        .into_iter()
        .map(plain)
        .collect::<String>();

        insta::assert_snapshot!(rendered.trim_end(), @r"
        [12:00:00] [>] Changed: handlers/user.go
        [12:00:00] [..] Building main.go...
        [12:00:00] [OK] Built main in 420ms
        [12:00:00] [RUN] Running main (pid 4242)
        ");
    }

    #[test]
    fn renders_exit_reasons() {
        let failed = plain(DevEvent::ProcessExited {
            pid: 7,
            reason: ExitReason::Failed {
                status: "exit status: 2".to_string(),
            },
        });
        assert_eq!(
            failed,
            "[12:00:00] [WARN] Program exited with exit status: 2 (pid 7)\n"
        );

        let restarted = plain(DevEvent::ProcessExited {
            pid: 7,
            reason: ExitReason::Restarted,
        });
        assert!(restarted.contains("stopped for rebuild"));
    }

    #[test]
    fn renders_problems_with_phase() {
        let warning = plain(DevEvent::Warning {
            phase: Phase::Cleanup,
            message: "permission denied".to_string(),
        });
        assert_eq!(warning, "[12:00:00] [WARN] cleanup: permission denied\n");

        let error = plain(DevEvent::Error {
            phase: Phase::Run,
            message: "no such file".to_string(),
        });
        assert_eq!(error, "[12:00:00] [FAIL] run error: no such file\n");
    }

    #[test]
    fn renders_shutdown_on_its_own_line() {
        let rendered = plain(DevEvent::Shutdown);
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("Watch stopped."));
    }

    #[test]
    fn renders_unicode_icons() {
        let rendered = render_dev_event(
            "12:00:00",
            &DevEvent::BuildFailed {
                message: "exit status: 1".to_string(),
            },
            false,
            true,
        );
        assert_eq!(rendered, "[12:00:00] ✗ Build failed: exit status: 1\n");
    }
}
