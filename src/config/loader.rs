//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DevError, DevResult};

use super::types::Config;

/// Project config file looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "godev.toml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "unknown key '{}' in {}:{}",
                self.key,
                self.file.display(),
                line
            ),
            None => write!(f, "unknown key '{}' in {}", self.key, self.file.display()),
        }
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> DevResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|e| DevError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| DevError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                line: find_line_number(&content, &key),
                key,
                file: path.to_path_buf(),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Resolve the config for a project.
///
/// Layers, lowest first: defaults, the user file
/// (`<config dir>/godev/config.toml`), then the project file (`--config` if
/// given, else `./godev.toml`). A layer replaces whole sections; a section
/// left empty in a file does not override lower layers. An explicit file must
/// exist. `GODEV_*` environment overrides apply on top.
pub fn load_for_project(
    project_root: &Path,
    explicit: Option<&Path>,
) -> DevResult<(Config, Vec<ConfigWarning>)> {
    let project = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(project_root.join(PROJECT_CONFIG_FILE)).filter(|p| p.is_file()),
    };
    let user = user_config_path().filter(|p| p.is_file());

    let (config, warnings) = load_layers(user.iter().chain(project.iter()))?;
    Ok((with_env_overrides(config), warnings))
}

pub(crate) fn load_layers<'a>(
    files: impl IntoIterator<Item = &'a PathBuf>,
) -> DevResult<(Config, Vec<ConfigWarning>)> {
    let mut merged = Config::default();
    let mut warnings = Vec::new();

    for path in files {
        let (parsed, file_warnings) = load_with_warnings(path)?;
        warnings.extend(file_warnings);

        let value = read_toml_value(path)?;
        let Some(table) = value.as_table() else {
            continue;
        };
        if has_non_empty_table(table, "watch") {
            merged.watch = parsed.watch;
        }
        if has_non_empty_table(table, "build") {
            merged.build = parsed.build;
        }
        if has_non_empty_table(table, "run") {
            merged.run = parsed.run;
        }
        if has_non_empty_table(table, "output") {
            merged.output = parsed.output;
        }
    }

    Ok((merged, warnings))
}

fn read_toml_value(path: &Path) -> DevResult<toml::Value> {
    let content = fs::read_to_string(path).map_err(|e| DevError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| DevError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn has_non_empty_table(root: &toml::map::Map<String, toml::Value>, key: &str) -> bool {
    match root.get(key) {
        Some(toml::Value::Table(t)) => !t.is_empty(),
        _ => false,
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("godev").join("config.toml"))
}

/// Apply environment variable overrides (GODEV_* prefix)
pub fn with_env_overrides(config: Config) -> Config {
    with_env_overrides_from(config, |key| std::env::var(key).ok())
}

pub(crate) fn with_env_overrides_from(
    mut config: Config,
    get_env: impl Fn(&str) -> Option<String>,
) -> Config {
    // GODEV_DEBOUNCE_MS
    if let Some(ms) = get_env("GODEV_DEBOUNCE_MS").and_then(|v| v.trim().parse().ok()) {
        config.watch.debounce_ms = ms;
    }

    // GODEV_GRACE_MS
    if let Some(ms) = get_env("GODEV_GRACE_MS").and_then(|v| v.trim().parse().ok()) {
        config.run.grace_ms = ms;
    }

    // GODEV_EXTENSIONS (comma-separated)
    if let Some(list) = get_env("GODEV_EXTENSIONS") {
        let parsed: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !parsed.is_empty() {
            config.watch.extensions = parsed;
        }
    }

    config
}

fn find_line_number(content: &str, key: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| {
            let trimmed = line.trim_start();
            trimmed
                .strip_prefix(key)
                .map(|rest| rest.trim_start().starts_with('='))
                .unwrap_or(false)
        })
        .map(|idx| idx + 1)
}
