//! Build artifact naming and removal

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{DevError, DevResult};

/// Name used when the source path has no usable file stem.
const FALLBACK_NAME: &str = "godev-app";

/// The compiled binary on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Artifact for `source` inside `dir`.
    ///
    /// An explicit `name` wins; otherwise the source file stem is used
    /// (`cmd/server/main.go` builds `main`). The platform executable suffix
    /// is appended when missing. A name that would land on the source itself
    /// or on an existing directory (`godev server`, `godev api/`) is replaced
    /// by the fallback name, since the artifact is deleted before every build.
    pub fn for_source(dir: &Path, source: &Path, name: Option<&str>) -> Self {
        let base = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        let source = dir.join(source);
        let artifact = [base.as_str(), FALLBACK_NAME]
            .into_iter()
            .map(|base| dir.join(executable_name(base)))
            .find(|path| !collides(path, &source))
            .map(Self::new)
            .unwrap_or_else(|| {
                Self::new(dir.join(executable_name(&format!("{FALLBACK_NAME}-bin"))))
            });
        artifact
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Remove the artifact from disk.
    ///
    /// Returns `Ok(true)` if a file was removed and `Ok(false)` if there was
    /// nothing to remove. Removing twice is never an error.
    pub fn remove(&self) -> DevResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DevError::Cleanup {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn executable_name(base: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || base.ends_with(suffix) {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

/// True if removing or overwriting `path` would hit the user's files.
fn collides(path: &Path, source: &Path) -> bool {
    if path == source || path.is_dir() {
        return true;
    }
    match (std::fs::canonicalize(path), std::fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
