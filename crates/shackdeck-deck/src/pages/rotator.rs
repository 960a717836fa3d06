// ── Rotator heading entry ──
//
// Numeric keypad for one rotator. Built on demand when a rotator button is
// released and dropped when navigation leaves it; the entry buffer always
// starts empty.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use shackdeck_core::{CoreError, MAX_HEADING, Rotator};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::PresetPage;
use crate::page::{Page, PageRef};
use crate::surface::{ButtonFace, ButtonSurface, PressState, paint, paint_all};
use crate::theme;

const DISPLAY: usize = 0;
const BACK: usize = 4;
const SET: usize = 5;
const PRESET: usize = 9;

/// Keypad position → digit.
const KEYPAD: [(usize, u8); 10] = [
    (10, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (8, 4),
    (7, 5),
    (6, 6),
    (13, 7),
    (12, 8),
    (11, 9),
];

const MAX_DIGITS: usize = 3;

struct ControlState {
    active: bool,
    entry: String,
}

pub struct RotatorControlPage {
    id: String,
    parent: PageRef,
    rotator: Arc<dyn Rotator>,
    surface: Arc<dyn ButtonSurface>,
    this: Weak<RotatorControlPage>,
    state: Mutex<ControlState>,
}

impl RotatorControlPage {
    pub fn new(
        parent: PageRef,
        rotator: Arc<dyn Rotator>,
        surface: Arc<dyn ButtonSurface>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: format!("rotator:{}", rotator.name()),
            parent,
            rotator,
            surface,
            this: this.clone(),
            state: Mutex::new(ControlState {
                active: false,
                entry: String::new(),
            }),
        })
    }

    fn digit(position: usize) -> Option<u8> {
        KEYPAD
            .iter()
            .find(|(pos, _)| *pos == position)
            .map(|(_, digit)| *digit)
    }

    fn render(entry: &str) -> Vec<(usize, ButtonFace)> {
        let mut faces = vec![
            (DISPLAY, theme::display(entry)),
            (BACK, theme::key("BACK")),
            (SET, theme::key("SET")),
            (PRESET, theme::key("PSET")),
        ];
        faces.extend(
            KEYPAD
                .iter()
                .map(|(pos, digit)| (*pos, theme::key(&digit.to_string()))),
        );
        faces.sort_by_key(|(pos, _)| *pos);
        faces
    }

    fn show_entry(&self, state: &ControlState) {
        if state.active {
            paint(self.surface.as_ref(), DISPLAY, &theme::display(&state.entry));
        }
    }

    /// SET: command the entered heading and go back, or reject it.
    async fn submit(&self) -> Option<PageRef> {
        let mut state = self.state.lock().await;
        let Ok(heading) = state.entry.parse::<u16>() else {
            return None;
        };

        if heading > MAX_HEADING {
            let err = CoreError::OutOfRangeHeading {
                heading,
                max: MAX_HEADING,
            };
            info!(device = %self.rotator.name(), error = %err, "heading rejected");
            state.entry.clear();
            self.show_entry(&state);
            return None;
        }
        drop(state);

        if let Err(e) = self.rotator.set_heading(heading).await {
            warn!(device = %self.rotator.name(), heading, error = %e, "set heading failed");
        }
        Some(Arc::clone(&self.parent))
    }
}

#[async_trait]
impl Page for RotatorControlPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set(&self, position: usize, state: PressState) -> Option<PageRef> {
        if state == PressState::Pressed {
            return None;
        }

        match position {
            BACK => Some(Arc::clone(&self.parent)),
            SET => self.submit().await,
            PRESET => {
                let parent: PageRef = self.this.upgrade()?;
                let preset: PageRef =
                    PresetPage::new(parent, Arc::clone(&self.rotator), Arc::clone(&self.surface));
                Some(preset)
            }
            _ => {
                let digit = Self::digit(position)?;
                let mut state = self.state.lock().await;
                if state.entry.len() < MAX_DIGITS {
                    state.entry.push(char::from(b'0' + digit));
                    self.show_entry(&state);
                }
                None
            }
        }
    }

    async fn draw(&self) {
        let state = self.state.lock().await;
        if state.active {
            let faces = Self::render(&state.entry);
            paint_all(self.surface.as_ref(), faces.iter().map(|(p, f)| (*p, f)));
        }
    }

    async fn set_active(&self, active: bool) {
        self.state.lock().await.active = active;
    }

    async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    fn parent(&self) -> Option<PageRef> {
        Some(Arc::clone(&self.parent))
    }

    async fn faces(&self) -> Vec<(usize, ButtonFace)> {
        Self::render(&self.state.lock().await.entry)
    }
}
