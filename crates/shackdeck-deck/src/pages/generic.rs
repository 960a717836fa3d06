// ── Layout-driven page ──
//
// Labels, rotator buttons and terminal buttons as declared in the layout.
// Subscribes to the hub under its page id and keeps device buttons bound to
// whatever the hub currently holds.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use shackdeck_core::{DeviceHub, Port, Rotator, StatusEvent, StatusKind, StatusSubscriber, Switch};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::RotatorControlPage;
use crate::graph::PageTable;
use crate::page::{Page, PageRef};
use crate::press::{Press, PressTracker};
use crate::surface::{ButtonFace, ButtonSurface, PressState, paint, paint_all};
use crate::widget::{ButtonSet, Widget};

struct GenericState {
    active: bool,
    buttons: ButtonSet,
    presses: PressTracker,
}

/// What a released button asks for, captured so the page lock is not held
/// across device commands.
enum Action {
    Navigate(Option<String>),
    OpenRotator(Option<Arc<dyn Rotator>>),
    Terminal {
        switch: Option<Arc<dyn Switch>>,
        port: String,
        terminal: String,
        on: bool,
        next: Option<String>,
    },
}

pub struct GenericPage {
    id: String,
    parent: Option<String>,
    hub: Arc<DeviceHub>,
    surface: Arc<dyn ButtonSurface>,
    table: Weak<PageTable>,
    this: Weak<GenericPage>,
    state: Mutex<GenericState>,
}

impl GenericPage {
    pub(crate) fn new(
        id: String,
        parent: Option<String>,
        buttons: ButtonSet,
        table: Weak<PageTable>,
        hub: Arc<DeviceHub>,
        surface: Arc<dyn ButtonSurface>,
        long_press: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            parent,
            hub,
            surface,
            table,
            this: this.clone(),
            state: Mutex::new(GenericState {
                active: false,
                buttons,
                presses: PressTracker::new(long_press),
            }),
        })
    }

    /// Subscribe to hub status events and bind devices that are already
    /// registered.
    pub(crate) async fn attach(self: &Arc<Self>) -> Result<(), shackdeck_core::CoreError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscriber: Weak<dyn StatusSubscriber> = weak;
        self.hub.subscribe(self.id.clone(), subscriber).await?;

        let devices = self.state.lock().await.buttons.bound_devices();
        for device in devices {
            self.sync_device(&device).await;
        }
        Ok(())
    }

    fn page(&self, id: &str) -> Option<PageRef> {
        let page = self.table.upgrade().and_then(|table| table.get(id));
        if page.is_none() {
            warn!(page = %self.id, target = %id, "navigation target missing");
        }
        page
    }

    // ── Device binding ───────────────────────────────────────────────

    /// Bind or unbind every button for `name` to match the hub. Used for
    /// both `Add` and `Remove`, so late or reordered events settle on the
    /// hub's actual state.
    async fn sync_device(&self, name: &str) {
        let rotator = self.hub.rotator(name).await;
        let switch = self.hub.switch(name).await;

        let mut state = self.state.lock().await;
        let mut changed = match &rotator {
            Some(r) => state.buttons.resolve_rotator(name, r),
            None => state.buttons.release_rotator(name),
        };
        changed.extend(match &switch {
            Some(s) => state.buttons.resolve_switch(name, s),
            None => state.buttons.release_switch(name),
        });

        if !changed.is_empty() {
            debug!(page = %self.id, device = %name, buttons = ?changed, "device binding changed");
        }
        self.repaint(&state, &changed);
    }

    async fn refresh_device(&self, name: &str) {
        let mut state = self.state.lock().await;
        let changed = state.buttons.refresh(name);
        self.repaint(&state, &changed);
    }

    /// Push changed buttons to the surface, only while this page is shown.
    fn repaint(&self, state: &GenericState, positions: &[usize]) {
        if !state.active {
            return;
        }
        for &position in positions {
            if let Some(face) = state.buttons.face(position) {
                paint(self.surface.as_ref(), position, face);
            }
        }
    }

    // ── Button handling ──────────────────────────────────────────────

    async fn press_terminal(
        &self,
        press: Press,
        switch: Option<Arc<dyn Switch>>,
        port: String,
        terminal: String,
        on: bool,
        next: Option<String>,
    ) -> Option<PageRef> {
        let Some(switch) = switch else {
            debug!(page = %self.id, "terminal button not bound");
            return None;
        };
        let command = Port::single(port, terminal, !on);

        match press {
            Press::Short => {
                if let Err(e) = switch.set_port(command).await {
                    warn!(device = %switch.name(), error = %e, "terminal toggle failed");
                }
                None
            }
            Press::Long => {
                if !on {
                    if let Err(e) = switch.set_port(command).await {
                        warn!(device = %switch.name(), error = %e, "terminal switch-on failed");
                        return None;
                    }
                }
                next.and_then(|id| self.page(&id))
            }
        }
    }
}

#[async_trait]
impl Page for GenericPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set(&self, position: usize, state: PressState) -> Option<PageRef> {
        let mut page = self.state.lock().await;
        let press = page.presses.track(position, state)?;
        debug!(page = %self.id, position, %press, "button released");

        let action = match page.buttons.get(position)? {
            Widget::Label(b) => Action::Navigate(b.next.clone()),
            Widget::Rotator(b) => match (press, &b.next) {
                (Press::Long, Some(next)) => Action::Navigate(Some(next.clone())),
                _ => Action::OpenRotator(b.handle.clone()),
            },
            Widget::Terminal(b) => Action::Terminal {
                switch: b.handle.clone(),
                port: b.port.clone(),
                terminal: b.terminal.clone(),
                on: b.state,
                next: b.next.clone(),
            },
        };
        drop(page);

        match action {
            Action::Navigate(next) => next.and_then(|id| self.page(&id)),
            Action::OpenRotator(None) => None,
            Action::OpenRotator(Some(rotator)) => {
                let parent: PageRef = self.this.upgrade()?;
                let control: PageRef =
                    RotatorControlPage::new(parent, rotator, Arc::clone(&self.surface));
                Some(control)
            }
            Action::Terminal {
                switch,
                port,
                terminal,
                on,
                next,
            } => {
                self.press_terminal(press, switch, port, terminal, on, next)
                    .await
            }
        }
    }

    async fn draw(&self) {
        let state = self.state.lock().await;
        if state.active {
            paint_all(self.surface.as_ref(), state.buttons.faces());
        }
    }

    async fn set_active(&self, active: bool) {
        self.state.lock().await.active = active;
    }

    async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    fn parent(&self) -> Option<PageRef> {
        self.parent.as_deref().and_then(|id| self.page(id))
    }

    async fn faces(&self) -> Vec<(usize, ButtonFace)> {
        self.state
            .lock()
            .await
            .buttons
            .faces()
            .map(|(pos, face)| (pos, face.clone()))
            .collect()
    }
}

#[async_trait]
impl StatusSubscriber for GenericPage {
    async fn on_status(&self, event: StatusEvent) {
        match event.kind {
            StatusKind::Add | StatusKind::Remove => self.sync_device(&event.device).await,
            StatusKind::Update => self.refresh_device(&event.device).await,
        }
    }
}
