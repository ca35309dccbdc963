//! Watch loop: filesystem events in, rebuilds out
//!
//! Every directory under the root is registered individually with the
//! `notify` backend. Events pass the change filter, then the debouncer, and
//! an accepted event runs the rebuild cycle synchronously.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use ignore::WalkBuilder;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecursiveMode, Watcher};

use crate::debounce::Debouncer;
use crate::error::{DevError, DevResult, Phase};
use crate::event::{DevEvent, EventSink};
use crate::filter::ChangeFilter;
use crate::session::DevSession;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What happened to a path, as far as rebuilding is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Write,
    Other,
}

/// A single path change, consumed immediately by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Write,
        }
    }

    /// Split a backend event into one event per path.
    ///
    /// Content writes, creations and the destination of a rename (the last
    /// step of an editor's temp-file swap) count as writes.
    pub fn from_notify(event: notify::Event) -> Vec<WatchEvent> {
        let kind = match event.kind {
            EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Write,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let last = event.paths.len().saturating_sub(1);
                return event
                    .paths
                    .into_iter()
                    .enumerate()
                    .map(|(idx, path)| WatchEvent {
                        path,
                        kind: if idx == last {
                            ChangeKind::Write
                        } else {
                            ChangeKind::Other
                        },
                    })
                    .collect();
            }
            _ => ChangeKind::Other,
        };

        event
            .paths
            .into_iter()
            .map(|path| WatchEvent { path, kind })
            .collect()
    }
}

fn is_skipped(path: &Path, skip: &[String]) -> bool {
    path.file_name()
        .map(|name| skip.iter().any(|s| name == s.as_str()))
        .unwrap_or(false)
}

/// Register `root` and every directory below it with the watcher.
///
/// Files are not registered one by one: the backends report changes to
/// files through their parent directory. Returns the number of directories
/// registered. Directories named in `skip` are not descended into.
pub fn register_tree<W: Watcher>(
    watcher: &mut W,
    root: &Path,
    skip: &[String],
) -> DevResult<usize> {
    let skip_names = skip.to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && entry.depth() > 0 && is_skipped(entry.path(), &skip_names))
        })
        .build();

    let mut registered = 0;
    for entry in walker {
        let entry = entry.map_err(|e| DevError::WatcherSetup {
            path: root.to_path_buf(),
            source: notify::Error::generic(&e.to_string()),
        })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        watcher
            .watch(entry.path(), RecursiveMode::NonRecursive)
            .map_err(|source| DevError::WatcherSetup {
                path: entry.path().to_path_buf(),
                source,
            })?;
        registered += 1;
    }

    Ok(registered)
}

/// Filter → debounce → rebuild.
pub struct WatchLoop<'a> {
    session: &'a DevSession,
    filter: ChangeFilter,
    debouncer: Debouncer,
    root: PathBuf,
    skip: Vec<String>,
    sink: EventSink,
}

impl<'a> WatchLoop<'a> {
    pub fn new(
        session: &'a DevSession,
        filter: ChangeFilter,
        debouncer: Debouncer,
        root: impl Into<PathBuf>,
        sink: EventSink,
    ) -> Self {
        Self {
            session,
            filter,
            debouncer,
            root: root.into(),
            skip: Vec::new(),
            sink,
        }
    }

    /// Directory names that are never registered, not even when created later.
    pub fn with_skip(mut self, skip: Vec<String>) -> Self {
        self.skip = skip;
        self
    }

    /// Drain backend events until `running` is cleared.
    ///
    /// Watcher errors are reported and never end the loop.
    pub fn run<W: Watcher>(
        &self,
        watcher: &mut W,
        events: &Receiver<notify::Result<notify::Event>>,
        running: &AtomicBool,
    ) {
        while running.load(Ordering::SeqCst) {
            match events.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    if matches!(event.kind, EventKind::Create(_)) {
                        self.register_new_dirs(watcher, &event.paths);
                    }
                    for change in WatchEvent::from_notify(event) {
                        self.on_event(&change);
                    }
                }
                Ok(Err(e)) => (self.sink)(DevEvent::Error {
                    phase: Phase::Watch,
                    message: e.to_string(),
                }),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    (self.sink)(DevEvent::Error {
                        phase: Phase::Watch,
                        message: "watcher stopped delivering events".to_string(),
                    });
                    return;
                }
            }
        }
    }

    /// Handle one change. Returns true if it triggered a rebuild.
    pub fn on_event(&self, event: &WatchEvent) -> bool {
        if event.kind != ChangeKind::Write || !self.filter.is_relevant(&event.path) {
            return false;
        }
        // Our own build output must never trigger another build
        if event.path == self.session.artifact().path() {
            return false;
        }
        if !self.debouncer.attempt(Instant::now()) {
            return false;
        }

        let shown = event.path.strip_prefix(&self.root).unwrap_or(&event.path);
        (self.sink)(DevEvent::FileChanged {
            path: shown.display().to_string(),
        });
        self.session.rebuild();
        true
    }

    fn register_new_dirs<W: Watcher>(&self, watcher: &mut W, paths: &[PathBuf]) {
        for dir in paths.iter().filter(|p| p.is_dir()) {
            if is_skipped(dir, &self.skip) {
                continue;
            }
            // Late registrations are best effort: the rest of the tree still works
            if let Err(e) = register_tree(watcher, dir, &self.skip) {
                (self.sink)(DevEvent::Warning {
                    phase: Phase::Watch,
                    message: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::builder::Builder;
    use crate::supervisor::{ProcessSupervisor, SupervisorOptions};
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Counts builds and always fails, so no process is ever started.
    struct CountingBuilder(Arc<AtomicUsize>);

    impl Builder for CountingBuilder {
        fn build(&self, _source: &Path) -> DevResult<Artifact> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(DevError::Build {
                command: "count".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }

    fn session(builds: &Arc<AtomicUsize>) -> DevSession {
        let sink = crate::event::null_sink();
        DevSession::new(
            "main.go",
            Artifact::new("/work/main"),
            Box::new(CountingBuilder(Arc::clone(builds))),
            ProcessSupervisor::new(SupervisorOptions::default(), sink.clone()),
            sink,
        )
    }

    fn watch_loop(session: &DevSession, quiet: Duration) -> WatchLoop<'_> {
        WatchLoop::new(
            session,
            ChangeFilter::default(),
            Debouncer::new(quiet),
            "/work",
            crate::event::null_sink(),
        )
    }

    fn notify_event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    /// Records every registered path instead of watching it.
    #[derive(Default)]
    struct RecordingWatcher {
        watched: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl Watcher for RecordingWatcher {
        fn new<F: notify::EventHandler>(
            _handler: F,
            _config: notify::Config,
        ) -> notify::Result<Self> {
            Ok(Self::default())
        }

        fn watch(&mut self, path: &Path, _mode: RecursiveMode) -> notify::Result<()> {
            self.watched.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, _path: &Path) -> notify::Result<()> {
            Ok(())
        }

        fn kind() -> notify::WatcherKind {
            notify::WatcherKind::NullWatcher
        }
    }

    #[test]
    fn data_writes_are_writes() {
        let events = WatchEvent::from_notify(notify_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/work/main.go"],
        ));
        assert_eq!(events, vec![WatchEvent::write("/work/main.go")]);
    }

    #[test]
    fn removals_are_not_writes() {
        let events = WatchEvent::from_notify(notify_event(
            EventKind::Remove(RemoveKind::File),
            &["/work/main.go"],
        ));
        assert_eq!(events[0].kind, ChangeKind::Other);
    }

    #[test]
    fn rename_both_marks_only_destination() {
        let events = WatchEvent::from_notify(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/work/.main.go.swp", "/work/main.go"],
        ));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::Other);
        assert_eq!(events[1], WatchEvent::write("/work/main.go"));
    }

    #[test]
    fn irrelevant_and_non_write_events_do_not_rebuild() {
        let builds = Arc::new(AtomicUsize::new(0));
        let session = session(&builds);
        let lp = watch_loop(&session, Duration::from_millis(100));

        assert!(!lp.on_event(&WatchEvent::write("/work/README.md")));
        assert!(!lp.on_event(&WatchEvent {
            path: PathBuf::from("/work/main.go"),
            kind: ChangeKind::Other,
        }));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn burst_of_writes_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let session = session(&builds);
        let lp = watch_loop(&session, Duration::from_secs(60));

        assert!(lp.on_event(&WatchEvent::write("/work/main.go")));
        assert!(!lp.on_event(&WatchEvent::write("/work/main.go")));
        assert!(!lp.on_event(&WatchEvent::write("/work/static/site.css")));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn writes_after_quiet_interval_build_again() {
        let builds = Arc::new(AtomicUsize::new(0));
        let session = session(&builds);
        let lp = watch_loop(&session, Duration::from_millis(20));

        assert!(lp.on_event(&WatchEvent::write("/work/main.go")));
        std::thread::sleep(Duration::from_millis(40));
        assert!(lp.on_event(&WatchEvent::write("/work/main.go")));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn artifact_writes_are_ignored() {
        let builds = Arc::new(AtomicUsize::new(0));
        let sink = crate::event::null_sink();
        let session = DevSession::new(
            "main.go",
            Artifact::new("/work/app.js"),
            Box::new(CountingBuilder(Arc::clone(&builds))),
            ProcessSupervisor::new(SupervisorOptions::default(), sink.clone()),
            sink,
        );
        let lp = watch_loop(&session, Duration::from_millis(1));

        assert!(!lp.on_event(&WatchEvent::write("/work/app.js")));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn register_tree_registers_every_directory() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cmd/api")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("main.go"), "package main").unwrap();

        let mut watcher = RecordingWatcher::default();
        let count = register_tree(&mut watcher, dir.path(), &[]).unwrap();

        // root, cmd, cmd/api, .git, .git/objects, static
        assert_eq!(count, 6);
        let watched = watcher.watched.lock().unwrap();
        assert!(watched.contains(&dir.path().to_path_buf()));
        assert!(watched.contains(&dir.path().join("cmd/api")));
        assert!(!watched.contains(&dir.path().join("main.go")));
    }

    #[test]
    fn register_tree_skips_ignored_names() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::create_dir_all(dir.path().join("web")).unwrap();

        let mut watcher = RecordingWatcher::default();
        let count = register_tree(&mut watcher, dir.path(), &[".git".to_string()]).unwrap();

        assert_eq!(count, 2);
        assert!(!watcher
            .watched
            .lock()
            .unwrap()
            .contains(&dir.path().join(".git")));
    }

    #[test]
    fn new_directories_are_registered_while_running() {
        let dir = tempdir().unwrap();
        let builds = Arc::new(AtomicUsize::new(0));
        let session = session(&builds);
        let lp = watch_loop(&session, Duration::from_millis(100));
        let mut watcher = RecordingWatcher::default();

        let created = dir.path().join("handlers");
        std::fs::create_dir_all(created.join("v1")).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Ok(notify_event(
            EventKind::Create(CreateKind::Folder),
            &[created.to_str().unwrap()],
        )))
        .unwrap();
        drop(tx);

        let running = AtomicBool::new(true);
        lp.run(&mut watcher, &rx, &running);

        let watched = watcher.watched.lock().unwrap();
        assert!(watched.contains(&created));
        assert!(watched.contains(&created.join("v1")));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn watcher_errors_do_not_stop_the_loop() {
        let builds = Arc::new(AtomicUsize::new(0));
        let session = session(&builds);
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let lp = WatchLoop::new(
            &session,
            ChangeFilter::default(),
            Debouncer::new(Duration::from_millis(100)),
            "/work",
            Arc::new(move |e| captured.lock().unwrap().push(e)),
        );

        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Err(notify::Error::generic("queue overflow"))).unwrap();
        tx.send(Ok(notify_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            &["/work/main.go"],
        )))
        .unwrap();
        drop(tx);

        let running = AtomicBool::new(true);
        lp.run(&mut RecordingWatcher::default(), &rx, &running);

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            DevEvent::Error { phase: Phase::Watch, message } if message.contains("queue overflow")
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, DevEvent::FileChanged { path } if path == "main.go")));
    }
}
