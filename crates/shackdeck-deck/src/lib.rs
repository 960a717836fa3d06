//! Page graph and navigation for the shackdeck button surface.
//!
//! - **[`PageController`]**: Single entry point for `(position, pressed|released)`
//!   events. Dispatches to the active [`Page`] and performs transitions:
//!   deactivate, clear the surface, activate, redraw.
//!
//! - **[`PageGraph`]**: Two-phase build of the layout pages from
//!   [`PageLayout`]s: ids first, then edges, then widgets. Edges may
//!   converge and cycle.
//!
//! - **Pages** ([`pages`]): [`GenericPage`] (labels, rotator and terminal
//!   buttons bound to hub devices by name), [`RotatorControlPage`] (heading
//!   keypad), and [`PresetPage`] (compass rose).
//!
//! - **[`ButtonSurface`]**: What the physical driver must provide.

pub mod controller;
pub mod error;
pub mod graph;
pub mod layout;
pub mod page;
pub mod pages;
pub mod press;
pub mod surface;
pub mod theme;
mod widget;

// ── Primary re-exports ──────────────────────────────────────────────
pub use controller::PageController;
pub use error::DeckError;
pub use graph::{GraphOptions, PageGraph, PageTable};
pub use layout::{ButtonLayout, PageLayout};
pub use page::{Page, PageRef};
pub use pages::{GenericPage, PresetPage, RotatorControlPage};
pub use press::{LONG_PRESS, Press, PressTracker};
pub use surface::{ButtonFace, ButtonSurface, PressState, Rgb};
