//! Configuration type definitions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debounce::DEBOUNCE_MS;
use crate::filter::{ChangeFilter, DEFAULT_EXTENSIONS};
use crate::supervisor::DEFAULT_GRACE_MS;

/// Main configuration structure (`godev.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Which changes trigger a rebuild
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    pub extensions: Vec<String>,
    pub debounce_ms: u64,
    /// Directory names never registered with the watcher
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            debounce_ms: DEBOUNCE_MS,
            ignore: Vec::new(),
        }
    }
}

/// External compiler invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Program and arguments; `{output}` and `{source}` are substituted
    pub command: Vec<String>,
    /// Artifact file name (default: source file stem)
    pub artifact: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            artifact: None,
        }
    }
}

fn default_build_command() -> Vec<String> {
    ["go", "build", "-o", "{output}", "{source}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Supervised program settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    pub args: Vec<String>,
    pub grace_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub color: ColorMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.run.grace_ms)
    }

    pub fn change_filter(&self) -> ChangeFilter {
        ChangeFilter::new(&self.watch.extensions)
    }
}
