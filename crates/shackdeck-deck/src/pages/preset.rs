// ── Compass-rose presets ──

use std::sync::Arc;

use async_trait::async_trait;
use shackdeck_core::Rotator;
use tokio::sync::Mutex;
use tracing::warn;

use crate::page::{Page, PageRef};
use crate::surface::{ButtonFace, ButtonSurface, PressState, paint_all};
use crate::theme;

const BACK: usize = 4;

/// Position → (label, heading).
const PRESETS: [(usize, &str, u16); 11] = [
    (0, "NA", 320),
    (1, "NE", 45),
    (2, "N", 0),
    (3, "NW", 315),
    (5, "KH6", 350),
    (6, "E", 90),
    (8, "W", 270),
    (10, "VK", 75),
    (11, "SE", 135),
    (12, "S", 180),
    (13, "SW", 225),
];

/// Fixed headings for one rotator. A preset commands its heading and jumps
/// straight back to the page that opened the keypad.
pub struct PresetPage {
    id: String,
    parent: PageRef,
    rotator: Arc<dyn Rotator>,
    surface: Arc<dyn ButtonSurface>,
    active: Mutex<bool>,
}

impl PresetPage {
    pub fn new(
        parent: PageRef,
        rotator: Arc<dyn Rotator>,
        surface: Arc<dyn ButtonSurface>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: format!("preset:{}", rotator.name()),
            parent,
            rotator,
            surface,
            active: Mutex::new(false),
        })
    }

    fn render() -> Vec<(usize, ButtonFace)> {
        let mut faces: Vec<(usize, ButtonFace)> = PRESETS
            .iter()
            .map(|(pos, text, _)| (*pos, theme::key(text)))
            .collect();
        faces.push((BACK, theme::key("BACK")));
        faces.sort_by_key(|(pos, _)| *pos);
        faces
    }
}

#[async_trait]
impl Page for PresetPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set(&self, position: usize, state: PressState) -> Option<PageRef> {
        if state == PressState::Pressed {
            return None;
        }
        if position == BACK {
            return Some(Arc::clone(&self.parent));
        }

        let (_, text, heading) = PRESETS.iter().find(|(pos, _, _)| *pos == position)?;
        if let Err(e) = self.rotator.set_heading(*heading).await {
            warn!(device = %self.rotator.name(), preset = %text, error = %e, "preset failed");
        }
        Some(
            self.parent
                .parent()
                .unwrap_or_else(|| Arc::clone(&self.parent)),
        )
    }

    async fn draw(&self) {
        if *self.active.lock().await {
            let faces = Self::render();
            paint_all(self.surface.as_ref(), faces.iter().map(|(p, f)| (*p, f)));
        }
    }

    async fn set_active(&self, active: bool) {
        *self.active.lock().await = active;
    }

    async fn is_active(&self) -> bool {
        *self.active.lock().await
    }

    fn parent(&self) -> Option<PageRef> {
        Some(Arc::clone(&self.parent))
    }

    async fn faces(&self) -> Vec<(usize, ButtonFace)> {
        Self::render()
    }
}
