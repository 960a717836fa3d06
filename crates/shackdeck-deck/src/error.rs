// ── Deck error types ──
//
// Everything here is raised while building pages from a layout, except
// `Surface`, which drawing code logs and drops.

use shackdeck_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckError {
    // ── Layout construction ──────────────────────────────────────────
    #[error("page '{page}': button {position} already assigned")]
    DuplicatePosition { page: String, position: usize },

    #[error("page '{page}': button {position} outside surface of {buttons} buttons")]
    PositionOutOfRange {
        page: String,
        position: usize,
        buttons: usize,
    },

    #[error("unknown page '{page}'")]
    UnknownPage { page: String },

    #[error("page '{page}' declared twice")]
    DuplicatePage { page: String },

    // ── Surface ──────────────────────────────────────────────────────
    #[error("button surface: {message}")]
    Surface { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
