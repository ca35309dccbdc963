//! Lifecycle controller
//!
//! Startup registers the tree and runs the first build unconditionally. The
//! watch loop then runs until the shutdown flag is cleared (by the signal
//! handler), after which the running program is stopped and the artifact
//! removed.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::channel;
use std::sync::Arc;

use notify::{RecommendedWatcher, Watcher};

use crate::artifact::Artifact;
use crate::builder::CommandBuilder;
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{DevError, DevResult};
use crate::event::{DevEvent, EventSink};
use crate::session::DevSession;
use crate::supervisor::{ProcessSupervisor, SupervisorOptions};
use crate::watch::{register_tree, WatchLoop};

/// Everything needed to start a dev session.
#[derive(Debug, Clone)]
pub struct DevOptions {
    /// Watch root; also the working directory for builds and the program
    pub root: PathBuf,
    /// Source file to build, relative to `root` or absolute
    pub target: PathBuf,
    pub config: Config,
}

impl DevOptions {
    pub fn new(root: impl Into<PathBuf>, target: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            target: target.into(),
            config,
        }
    }

    pub fn artifact(&self) -> Artifact {
        Artifact::for_source(&self.root, &self.target, self.config.build.artifact.as_deref())
    }
}

/// The watch root: the directory godev was started in.
pub fn current_root() -> DevResult<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Run until `running` is cleared.
///
/// Only watcher setup failures are returned as errors; build and run
/// failures are reported through `sink` and the session carries on.
pub fn run(options: DevOptions, running: Arc<AtomicBool>, sink: EventSink) -> DevResult<()> {
    let artifact = options.artifact();
    let DevOptions {
        root,
        target,
        config,
    } = options;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .map_err(|source| DevError::WatcherSetup {
        path: root.clone(),
        source,
    })?;

    let directories = register_tree(&mut watcher, &root, &config.watch.ignore)?;

    sink(DevEvent::WatchStarted {
        root: root.display().to_string(),
        target: target.display().to_string(),
        directories,
    });

    let builder = CommandBuilder::new(config.build.command.clone(), artifact.clone(), &root);
    let supervisor = ProcessSupervisor::new(
        SupervisorOptions {
            args: config.run.args.clone(),
            grace: config.grace(),
            workdir: Some(root.clone()),
        },
        sink.clone(),
    )
    .with_running(Arc::clone(&running));
    let session = DevSession::new(target, artifact, Box::new(builder), supervisor, sink.clone());

    // No previous build to debounce against
    session.rebuild();

    WatchLoop::new(
        &session,
        config.change_filter(),
        Debouncer::new(config.debounce()),
        &root,
        sink,
    )
    .with_skip(config.watch.ignore.clone())
    .run(&mut watcher, &rx, &running);

    session.shutdown();
    Ok(())
}
