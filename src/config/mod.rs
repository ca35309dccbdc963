//! Configuration module for godev
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (GODEV_*)
//! 3. Project config (./godev.toml, or `--config`)
//! 4. User config (~/.config/godev/config.toml)
//! 5. Built-in defaults (lowest priority)

mod loader;
mod types;

pub use loader::{
    load_for_project, load_with_warnings, user_config_path, with_env_overrides, ConfigWarning,
    PROJECT_CONFIG_FILE,
};
pub use types::{BuildConfig, ColorMode, Config, OutputConfig, RunConfig, WatchConfig};
