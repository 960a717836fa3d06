//! Event loop: keyboard to button events, surface grid to terminal frames.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use shackdeck_core::{DeviceHub, DeviceKind};
use shackdeck_deck::{ButtonFace, PageController, PressState};

use crate::event::{Event, EventReader};
use crate::keymap::{KeyAction, map_key};
use crate::surface::TerminalSurface;
use crate::tui::Tui;
use crate::ui::{self, Status};

const RENDER_RATE: Duration = Duration::from_millis(50);

/// One simulated button press: press, optional hold, release.
#[derive(Debug, Clone, Copy)]
struct Press {
    position: usize,
    hold: Option<Duration>,
}

pub struct App {
    controller: Arc<PageController>,
    surface: Arc<TerminalSurface>,
    hub: Arc<DeviceHub>,
    long_press: Duration,
    columns: usize,
    faces: Vec<Option<ButtonFace>>,
    status: Status,
}

impl App {
    pub fn new(
        controller: Arc<PageController>,
        surface: Arc<TerminalSurface>,
        hub: Arc<DeviceHub>,
        long_press: Duration,
        columns: usize,
    ) -> Self {
        let faces = surface.snapshot();
        Self {
            controller,
            surface,
            hub,
            long_press,
            columns,
            faces,
            status: Status::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.controller.start().await;

        let presses = spawn_press_queue(Arc::clone(&self.controller));
        let mut events = EventReader::new(RENDER_RATE);
        info!("event loop started");

        while let Some(event) = events.next().await {
            match event {
                Event::Key(key) => match map_key(key) {
                    Some(KeyAction::Quit) => break,
                    Some(KeyAction::Tap(position)) => queue(&presses, position, None),
                    Some(KeyAction::Hold(position)) => {
                        queue(&presses, position, Some(self.long_press));
                    }
                    None => {}
                },
                Event::Resize => self.surface.invalidate(),
                Event::Render => {
                    let status = self.status().await;
                    let frame = self.surface.take_frame();
                    if frame.is_none() && status == self.status {
                        continue;
                    }
                    if let Some(faces) = frame {
                        self.faces = faces;
                    }
                    self.status = status;
                    tui.draw(|f| ui::render(f, &self.faces, self.columns, &self.status))?;
                }
            }
        }

        tui.exit();
        info!("event loop ended");
        Ok(())
    }

    async fn status(&self) -> Status {
        Status {
            page: self.controller.active_page().await.id().to_owned(),
            rotators: self.hub.device_count(DeviceKind::Rotator).await,
            switches: self.hub.device_count(DeviceKind::Switch).await,
        }
    }
}

fn queue(presses: &mpsc::UnboundedSender<Press>, position: usize, hold: Option<Duration>) {
    debug!(position, long = hold.is_some(), "button");
    let _ = presses.send(Press { position, hold });
}

/// Deliver presses to the controller one at a time, in key order, so every
/// release pairs with the press before it. Runs off the UI loop so a held
/// button does not stall rendering. Ends when the sender is dropped.
fn spawn_press_queue(controller: Arc<PageController>) -> mpsc::UnboundedSender<Press> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Press>();
    tokio::spawn(async move {
        while let Some(press) = rx.recv().await {
            deliver(&controller, press).await;
        }
    });
    tx
}

async fn deliver(controller: &PageController, press: Press) {
    controller
        .handle_button(press.position, PressState::Pressed)
        .await;
    if let Some(hold) = press.hold {
        tokio::time::sleep(hold).await;
    }
    controller
        .handle_button(press.position, PressState::Released)
        .await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shackdeck_config::Config;
    use shackdeck_core::DiscoveryWatcher;
    use shackdeck_deck::{GraphOptions, PageGraph};

    use super::*;
    use crate::sim::{SimFactory, SimRegistry};

    #[tokio::test(start_paused = true)]
    async fn back_to_back_keys_are_each_delivered() {
        let config = Config::default();
        let discovery = config.discovery_config();
        let hub = Arc::new(DeviceHub::new());
        let watcher = DiscoveryWatcher::new(
            hub.clone(),
            Arc::new(SimRegistry::new(&config.simulation, &discovery.prefixes)),
            Arc::new(SimFactory::new(&hub, &config.simulation)),
            discovery,
        );
        watcher.enumerate().await.unwrap();

        let surface = Arc::new(TerminalSurface::new(config.deck.buttons));
        let options = GraphOptions::new(hub.clone(), surface.clone());
        let graph = PageGraph::build(&config.pages, &config.root_page, options)
            .await
            .unwrap();
        let controller = Arc::new(PageController::new(graph, surface));
        controller.start().await;

        // OB11 starts on, 4L off.
        let presses = spawn_press_queue(controller.clone());
        queue(&presses, 5, None);
        queue(&presses, 6, None);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let port = hub.switch("Stack Match").await.unwrap().port("SM").unwrap();
        assert!(!port.terminal("Stack Match", "OB11").unwrap().state);
        assert!(port.terminal("Stack Match", "4L").unwrap().state);
        assert_eq!(controller.active_page().await.id(), "main");
    }
}
