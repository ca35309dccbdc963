use crate::ui::terminal::{detect_capabilities, TerminalCapabilities};
use godev::config::ColorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    pub json: bool,
    pub color: bool,
    pub unicode: bool,
}

impl UiContext {
    /// `color` is the merged setting: CLI flag over config.
    pub fn new(json: bool, color: ColorMode) -> Self {
        Self::from_caps(json, color, detect_capabilities())
    }

    pub(crate) fn from_caps(json: bool, color: ColorMode, caps: TerminalCapabilities) -> Self {
        let color = !json
            && match color {
                ColorMode::Never => false,
                ColorMode::Always => true,
                ColorMode::Auto => caps.is_tty && caps.supports_color && !caps.is_ci,
            };

        Self {
            json,
            color,
            unicode: caps.supports_unicode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tty_caps(is_ci: bool) -> TerminalCapabilities {
        TerminalCapabilities {
            is_tty: true,
            supports_color: true,
            supports_unicode: true,
            is_ci,
        }
    }

    #[test]
    fn auto_color_follows_terminal() {
        assert!(UiContext::from_caps(false, ColorMode::Auto, tty_caps(false)).color);
    }

    #[test]
    fn auto_color_disabled_in_ci() {
        assert!(!UiContext::from_caps(false, ColorMode::Auto, tty_caps(true)).color);
    }

    #[test]
    fn explicit_modes_win() {
        let mut caps = tty_caps(false);
        caps.supports_color = false;
        assert!(UiContext::from_caps(false, ColorMode::Always, caps).color);
        assert!(!UiContext::from_caps(false, ColorMode::Never, tty_caps(false)).color);
    }

    #[test]
    fn json_never_colors() {
        let ui = UiContext::from_caps(true, ColorMode::Always, tty_caps(false));
        assert!(ui.json);
        assert!(!ui.color);
    }
}
