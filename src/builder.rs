//! Builder port and the external-compiler implementation
//!
//! The compiler is treated as an opaque success/failure producer. Its
//! diagnostics go straight to the operator's stderr so error messages stay
//! legible.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::artifact::Artifact;
use crate::error::{DevError, DevResult};

/// Placeholder replaced with the artifact path in build arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Placeholder replaced with the source path in build arguments
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Produces a runnable artifact from a source file.
pub trait Builder: Send + Sync {
    fn build(&self, source: &Path) -> DevResult<Artifact>;
}

/// Runs an external compiler command.
///
/// Defaults to `go build -o {output} {source}`.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: Vec<String>,
    artifact: Artifact,
    workdir: PathBuf,
}

impl CommandBuilder {
    pub fn new(command: Vec<String>, artifact: Artifact, workdir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            artifact,
            workdir: workdir.into(),
        }
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// The command line with placeholders substituted.
    pub fn resolve_args(&self, source: &Path) -> Vec<String> {
        let output = self.artifact.path().display().to_string();
        let source = source.display().to_string();
        self.command
            .iter()
            .map(|arg| {
                arg.replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(SOURCE_PLACEHOLDER, &source)
            })
            .collect()
    }
}

impl Builder for CommandBuilder {
    fn build(&self, source: &Path) -> DevResult<Artifact> {
        let args = self.resolve_args(source);
        let display = args.join(" ");

        let Some((program, rest)) = args.split_first() else {
            return Err(DevError::BuildSpawn {
                command: display,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "build command is empty",
                ),
            });
        };

        let status = Command::new(program)
            .args(rest)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| DevError::BuildSpawn {
                command: display.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DevError::Build {
                command: display,
                status: status.to_string(),
            });
        }

        if !self.artifact.exists() {
            return Err(DevError::Build {
                command: display,
                status: format!("no artifact at {}", self.artifact.path().display()),
            });
        }

        Ok(self.artifact.clone())
    }
}
