// ── Page controller ──
//
// Single entry point for surface events. One async mutex serializes event
// handling with page transitions, so exactly one page is ever active and
// only that page paints the surface.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::graph::PageGraph;
use crate::page::PageRef;
use crate::surface::{ButtonSurface, PressState};

pub struct PageController {
    graph: PageGraph,
    surface: Arc<dyn ButtonSurface>,
    active: Mutex<PageRef>,
}

impl PageController {
    pub fn new(graph: PageGraph, surface: Arc<dyn ButtonSurface>) -> Self {
        let root = graph.root();
        Self {
            graph,
            surface,
            active: Mutex::new(root),
        }
    }

    pub fn graph(&self) -> &PageGraph {
        &self.graph
    }

    /// Show the root page.
    pub async fn start(&self) {
        let active = self.active.lock().await;
        self.clear_surface();
        active.set_active(true).await;
        active.draw().await;
    }

    pub async fn active_page(&self) -> PageRef {
        Arc::clone(&*self.active.lock().await)
    }

    /// Deliver one surface event to the active page and perform any
    /// transition it asks for. Returns whether the page changed.
    pub async fn handle_button(&self, position: usize, state: PressState) -> bool {
        let mut active = self.active.lock().await;
        let Some(next) = active.set(position, state).await else {
            return false;
        };

        debug!(from = %active.id(), to = %next.id(), "page transition");
        active.set_active(false).await;
        self.clear_surface();
        next.set_active(true).await;
        next.draw().await;
        *active = next;
        true
    }

    fn clear_surface(&self) {
        if let Err(e) = self.surface.clear_all() {
            warn!(error = %e, "clearing button surface failed");
        }
    }
}
