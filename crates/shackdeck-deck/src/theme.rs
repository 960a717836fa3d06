//! Button palette and the standard faces built from it.

use crate::surface::{ButtonFace, Rgb};

// ── Palette ───────────────────────────────────────────────────────────

pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const UNAVAILABLE_GREY: Rgb = Rgb::new(80, 80, 80); // #505050
pub const LABEL_GREEN: Rgb = Rgb::new(92, 184, 92); // #5cb85c
pub const DISPLAY_GREEN: Rgb = Rgb::new(0, 255, 0); // #00ff00

/// Text shown on a device button whose device is not in the hub.
pub const PLACEHOLDER: &str = "N/A";

// ── Faces ─────────────────────────────────────────────────────────────

/// Static menu label.
pub fn label(text: &str) -> ButtonFace {
    ButtonFace {
        text: text.to_owned(),
        text_color: LABEL_GREEN,
        background: BLACK,
        led: None,
    }
}

/// Unresolved device button. `led` is `Some(false)` for indicator buttons.
pub fn placeholder(led: Option<bool>) -> ButtonFace {
    ButtonFace {
        text: PLACEHOLDER.to_owned(),
        text_color: UNAVAILABLE_GREY,
        background: BLACK,
        led: led.map(|_| false),
    }
}

/// Resolved device button.
pub fn live(text: String, led: Option<bool>) -> ButtonFace {
    ButtonFace {
        text,
        text_color: WHITE,
        background: BLACK,
        led,
    }
}

/// Keypad and navigation keys on the device pages.
pub fn key(text: &str) -> ButtonFace {
    ButtonFace {
        text: text.to_owned(),
        text_color: WHITE,
        background: BLACK,
        led: None,
    }
}

/// Numeric entry readout.
pub fn display(text: &str) -> ButtonFace {
    ButtonFace {
        text: text.to_owned(),
        text_color: BLACK,
        background: DISPLAY_GREEN,
        led: None,
    }
}

/// Heading as shown on rotator buttons, right-aligned to three digits.
pub fn heading_text(heading: u16) -> String {
    format!("{heading:3}°")
}
