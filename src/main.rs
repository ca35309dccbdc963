//! godev CLI - rebuild and restart a program on every source change
//!
//! Usage: godev [OPTIONS] <FILE> [-- <ARGS>...]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use godev::{DevEvent, DevOptions, Phase};

mod cli;
mod ui;

use cli::Cli;
use ui::context::UiContext;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    let json = cli.json;
    if let Err(err) = run(cli) {
        ui::error::print_error(&err, json);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = godev::lifecycle::current_root()?;

    let (mut config, warnings) = godev::config::load_for_project(&root, cli.config.as_deref())?;
    cli.apply_to(&mut config);

    let ui = UiContext::new(cli.json, config.output.color);
    let sink = ui::views::watch::event_sink(ui);

    for warning in warnings {
        sink(DevEvent::Warning {
            phase: Phase::Config,
            message: warning.to_string(),
        });
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install the signal handler")?;

    if !ui.json {
        print!(
            "{}",
            ui::views::watch::render_watch_header(
                &cli.file.display().to_string(),
                ui.color,
                ui.unicode
            )
        );
    }

    godev::run(DevOptions::new(root, cli.file, config), running, sink)?;
    Ok(())
}
