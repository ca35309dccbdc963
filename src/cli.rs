use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use godev::config::{ColorMode, Config};

/// godev - rebuild and restart a program whenever its sources change
#[derive(Parser, Debug)]
#[command(name = "godev")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Press Ctrl+C to stop; the built executable is removed on exit.")]
pub struct Cli {
    /// Source file to build and run (relative to the current directory)
    pub file: PathBuf,

    /// Output events as NDJSON on stdout (the program's own stdout is passed
    /// through on the same stream)
    #[arg(long)]
    pub json: bool,

    /// Config file (default: ./godev.toml, then the user config)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quiet interval for coalescing change bursts
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Time a program gets to exit after an interrupt before it is killed
    #[arg(long, value_name = "MS")]
    pub grace_ms: Option<u64>,

    /// When to use colors
    #[arg(long, value_enum)]
    pub color: Option<ColorWhen>,

    /// Arguments passed to the program
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

impl From<ColorWhen> for ColorMode {
    fn from(value: ColorWhen) -> Self {
        match value {
            ColorWhen::Auto => ColorMode::Auto,
            ColorWhen::Always => ColorMode::Always,
            ColorWhen::Never => ColorMode::Never,
        }
    }
}

impl Cli {
    /// CLI flags win over every config layer.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ms) = self.debounce_ms {
            config.watch.debounce_ms = ms;
        }
        if let Some(ms) = self.grace_ms {
            config.run.grace_ms = ms;
        }
        if let Some(color) = self.color {
            config.output.color = color.into();
        }
        if !self.args.is_empty() {
            config.run.args = self.args.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_file() {
        let cli = Cli::try_parse_from(["godev", "main.go"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("main.go"));
        assert!(!cli.json);
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_cli_requires_file() {
        let err = Cli::try_parse_from(["godev"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_program_args_after_separator() {
        let cli =
            Cli::try_parse_from(["godev", "cmd/api/main.go", "--", "--port", "8080"]).unwrap();
        assert_eq!(cli.args, vec!["--port", "8080"]);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "godev",
            "--debounce-ms",
            "250",
            "--grace-ms",
            "10",
            "--color",
            "never",
            "main.go",
            "--",
            "serve",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.run.grace_ms, 10);
        assert_eq!(config.output.color, ColorMode::Never);
        assert_eq!(config.run.args, vec!["serve"]);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["godev", "main.go"]).unwrap();
        let mut config = Config::default();
        config.run.args = vec!["from-config".to_string()];

        cli.apply_to(&mut config);
        assert_eq!(config, {
            let mut expected = Config::default();
            expected.run.args = vec!["from-config".to_string()];
            expected
        });
    }
}
