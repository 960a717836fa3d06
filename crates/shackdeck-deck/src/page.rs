//! Page trait: one navigable screen of the button surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::surface::{ButtonFace, PressState};

pub type PageRef = Arc<dyn Page>;

/// Every screen implements Page.
///
/// Lifecycle: built once (layout pages) or on demand (device pages), then
/// `set_active(true)` → `draw` → `set`* → `set_active(false)`, repeated
/// each time the page is entered.
#[async_trait]
pub trait Page: Send + Sync {
    /// Identifier for logging and tests.
    fn id(&self) -> &str;

    /// Handle one surface event. Returns the page to switch to, if any.
    async fn set(&self, position: usize, state: PressState) -> Option<PageRef>;

    /// Paint every button. No-op while inactive.
    async fn draw(&self);

    async fn set_active(&self, active: bool);

    async fn is_active(&self) -> bool;

    /// Page one level up, if any.
    fn parent(&self) -> Option<PageRef>;

    /// Current visual of each assigned button, in position order.
    async fn faces(&self) -> Vec<(usize, ButtonFace)>;
}
