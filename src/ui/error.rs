use godev::{DevError, DevEvent, Phase};

use crate::ui::primitives::icon::Icon;

/// Render a fatal error as the final `error` event.
pub fn fatal_event(err: &anyhow::Error) -> DevEvent {
    match err.downcast_ref::<DevError>() {
        Some(dev) => DevEvent::error(dev),
        None => DevEvent::Error {
            phase: Phase::Config,
            message: format!("{:#}", err),
        },
    }
}

pub fn format_error(err: &anyhow::Error, supports_color: bool, supports_unicode: bool) -> String {
    let message = match err.downcast_ref::<DevError>() {
        Some(dev) => format!("{} error: {}", dev.phase(), dev),
        None => format!("{:#}", err),
    };
    format!(
        "{} {}\n",
        Icon::Error.colored(supports_color, supports_unicode),
        message
    )
}

pub fn print_error(err: &anyhow::Error, json: bool) {
    if json {
        println!("{}", fatal_event(err).to_json());
        return;
    }

    let caps = crate::ui::terminal::detect_capabilities();
    eprint!(
        "{}",
        format_error(err, caps.supports_color, caps.supports_unicode)
    );
}
