//! One dev session: the rebuild cycle and shutdown cleanup

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::Artifact;
use crate::builder::Builder;
use crate::event::{DevEvent, EventSink};
use crate::supervisor::{ProcessSupervisor, Termination};

/// Ties the builder, the artifact on disk and the supervisor together.
pub struct DevSession {
    source: PathBuf,
    artifact: Artifact,
    builder: Box<dyn Builder>,
    supervisor: ProcessSupervisor,
    sink: EventSink,
}

impl DevSession {
    pub fn new(
        source: impl Into<PathBuf>,
        artifact: Artifact,
        builder: Box<dyn Builder>,
        supervisor: ProcessSupervisor,
        sink: EventSink,
    ) -> Self {
        Self {
            source: source.into(),
            artifact,
            builder,
            supervisor,
            sink,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Remove the previous artifact, build, and on success swap the running
    /// process. Returns true when a new generation was started.
    ///
    /// A failed build leaves the last good process running.
    pub fn rebuild(&self) -> bool {
        self.remove_artifact();

        (self.sink)(DevEvent::BuildStarted {
            source: self.source.display().to_string(),
        });
        let started = Instant::now();

        let artifact = match self.builder.build(&self.source) {
            Ok(artifact) => artifact,
            Err(e) => {
                (self.sink)(DevEvent::BuildFailed {
                    message: e.to_string(),
                });
                return false;
            }
        };

        (self.sink)(DevEvent::BuildSucceeded {
            artifact: artifact.path().display().to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        match self.supervisor.replace(artifact.path()) {
            Ok(_) => true,
            Err(e) => {
                (self.sink)(DevEvent::error(&e));
                false
            }
        }
    }

    /// Stop the running program and delete the artifact.
    pub fn shutdown(&self) -> Option<Termination> {
        let outcome = self.supervisor.terminate_all();
        self.remove_artifact();
        (self.sink)(DevEvent::Shutdown);
        outcome
    }

    fn remove_artifact(&self) {
        match self.artifact.remove() {
            Ok(true) => (self.sink)(DevEvent::ArtifactRemoved {
                path: self.artifact.path().display().to_string(),
            }),
            Ok(false) => {}
            Err(e) => (self.sink)(DevEvent::warning(&e)),
        }
    }
}
