//! Seam to the physical button surface.
//!
//! The driver owns a fixed grid of buttons, accepts one visual per position,
//! and reports `(position, pressed|released)` through a single entry point
//! ([`PageController::handle_button`](crate::PageController::handle_button)).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DeckError;

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }
}

/// Everything a button can show: text, colours, and an optional on/off
/// indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonFace {
    pub text: String,
    pub text_color: Rgb,
    pub background: Rgb,
    /// `None` for buttons without an indicator.
    pub led: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PressState {
    Pressed,
    Released,
}

/// A fixed-size grid of drawable buttons.
pub trait ButtonSurface: Send + Sync {
    fn button_count(&self) -> usize;

    fn draw(&self, position: usize, face: &ButtonFace) -> Result<(), DeckError>;

    fn clear_all(&self) -> Result<(), DeckError>;
}

/// Draw one button, logging instead of failing.
pub(crate) fn paint(surface: &dyn ButtonSurface, position: usize, face: &ButtonFace) {
    if let Err(e) = surface.draw(position, face) {
        warn!(position, error = %e, "button draw failed");
    }
}

pub(crate) fn paint_all<'a>(
    surface: &dyn ButtonSurface,
    faces: impl IntoIterator<Item = (usize, &'a ButtonFace)>,
) {
    for (position, face) in faces {
        paint(surface, position, face);
    }
}
