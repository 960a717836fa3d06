// ── Layout-driven buttons ──
//
// Device buttons store only a device name. The live handle is filled in
// when the hub announces the device and dropped when it goes away; until
// then the button shows the grey placeholder.

use std::collections::BTreeMap;
use std::sync::Arc;

use shackdeck_core::{CoreError, Rotator, Switch};
use tracing::warn;

use crate::error::DeckError;
use crate::layout::ButtonLayout;
use crate::surface::ButtonFace;
use crate::theme;

pub(crate) struct LabelButton {
    pub face: ButtonFace,
    pub next: Option<String>,
}

pub(crate) struct RotatorButton {
    pub device: String,
    pub next: Option<String>,
    pub handle: Option<Arc<dyn Rotator>>,
    pub face: ButtonFace,
}

impl RotatorButton {
    fn resolve(&mut self, handle: Arc<dyn Rotator>) {
        self.face = theme::live(theme::heading_text(handle.heading()), None);
        self.handle = Some(handle);
    }

    fn refresh(&mut self) -> bool {
        let Some(handle) = &self.handle else {
            return false;
        };
        self.face.text = theme::heading_text(handle.heading());
        true
    }
}

pub(crate) struct TerminalButton {
    pub device: String,
    pub port: String,
    pub terminal: String,
    pub text: String,
    pub next: Option<String>,
    pub handle: Option<Arc<dyn Switch>>,
    /// Last energized state reported by the switch.
    pub state: bool,
    pub face: ButtonFace,
}

impl TerminalButton {
    fn read_state(&self, switch: &dyn Switch) -> Result<bool, CoreError> {
        let port = switch.port(&self.port)?;
        Ok(port.terminal(&self.device, &self.terminal)?.state)
    }

    fn resolve(&mut self, handle: Arc<dyn Switch>) -> bool {
        match self.read_state(handle.as_ref()) {
            Ok(state) => {
                self.state = state;
                self.face = theme::live(self.text.clone(), Some(state));
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                warn!(device = %self.device, error = %e, "cannot bind terminal button");
                false
            }
        }
    }

    fn refresh(&mut self) -> bool {
        let Some(handle) = self.handle.clone() else {
            return false;
        };
        match self.read_state(handle.as_ref()) {
            Ok(state) => {
                self.state = state;
                self.face.led = Some(state);
                true
            }
            Err(e) => {
                warn!(device = %self.device, error = %e, "cannot refresh terminal button");
                false
            }
        }
    }
}

pub(crate) enum Widget {
    Label(LabelButton),
    Rotator(RotatorButton),
    Terminal(TerminalButton),
}

impl Widget {
    fn from_layout(button: &ButtonLayout) -> Self {
        match button {
            ButtonLayout::Label { text, next, .. } => Self::Label(LabelButton {
                face: theme::label(text),
                next: next.clone(),
            }),
            ButtonLayout::Rotator { device, next, .. } => Self::Rotator(RotatorButton {
                device: device.clone(),
                next: next.clone(),
                handle: None,
                face: theme::placeholder(None),
            }),
            ButtonLayout::Terminal {
                device,
                port,
                terminal,
                text,
                next,
                ..
            } => Self::Terminal(TerminalButton {
                device: device.clone(),
                port: port.clone(),
                terminal: terminal.clone(),
                text: text.clone().unwrap_or_else(|| terminal.clone()),
                next: next.clone(),
                handle: None,
                state: false,
                face: theme::placeholder(Some(false)),
            }),
        }
    }

    pub fn face(&self) -> &ButtonFace {
        match self {
            Self::Label(b) => &b.face,
            Self::Rotator(b) => &b.face,
            Self::Terminal(b) => &b.face,
        }
    }
}

/// The buttons of one page, keyed by grid position.
pub(crate) struct ButtonSet {
    widgets: BTreeMap<usize, Widget>,
}

impl ButtonSet {
    /// Build from a layout, rejecting duplicate and out-of-range positions.
    pub fn from_layout(
        page: &str,
        buttons: &[ButtonLayout],
        button_count: usize,
    ) -> Result<Self, DeckError> {
        let mut widgets = BTreeMap::new();
        for button in buttons {
            let position = button.position();
            if position >= button_count {
                return Err(DeckError::PositionOutOfRange {
                    page: page.to_owned(),
                    position,
                    buttons: button_count,
                });
            }
            if widgets.contains_key(&position) {
                return Err(DeckError::DuplicatePosition {
                    page: page.to_owned(),
                    position,
                });
            }
            widgets.insert(position, Widget::from_layout(button));
        }
        Ok(Self { widgets })
    }

    pub fn get(&self, position: usize) -> Option<&Widget> {
        self.widgets.get(&position)
    }

    pub fn faces(&self) -> impl Iterator<Item = (usize, &ButtonFace)> {
        self.widgets.iter().map(|(pos, w)| (*pos, w.face()))
    }

    pub fn face(&self, position: usize) -> Option<&ButtonFace> {
        self.widgets.get(&position).map(Widget::face)
    }

    /// Device names this page's buttons are bound to.
    pub fn bound_devices(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .widgets
            .values()
            .filter_map(|w| match w {
                Widget::Rotator(b) => Some(b.device.clone()),
                Widget::Terminal(b) => Some(b.device.clone()),
                Widget::Label(_) => None,
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    // ── Device binding ───────────────────────────────────────────────
    //
    // Each returns the positions whose face changed.

    pub fn resolve_rotator(&mut self, name: &str, handle: &Arc<dyn Rotator>) -> Vec<usize> {
        let mut changed = Vec::new();
        for (pos, widget) in &mut self.widgets {
            if let Widget::Rotator(b) = widget {
                if b.device == name {
                    b.resolve(Arc::clone(handle));
                    changed.push(*pos);
                }
            }
        }
        changed
    }

    pub fn resolve_switch(&mut self, name: &str, handle: &Arc<dyn Switch>) -> Vec<usize> {
        let mut changed = Vec::new();
        for (pos, widget) in &mut self.widgets {
            if let Widget::Terminal(b) = widget {
                if b.device == name && b.resolve(Arc::clone(handle)) {
                    changed.push(*pos);
                }
            }
        }
        changed
    }

    /// Back to the placeholder for rotator buttons bound to `name`.
    pub fn release_rotator(&mut self, name: &str) -> Vec<usize> {
        let mut changed = Vec::new();
        for (pos, widget) in &mut self.widgets {
            if let Widget::Rotator(b) = widget {
                if b.device == name && b.handle.take().is_some() {
                    b.face = theme::placeholder(None);
                    changed.push(*pos);
                }
            }
        }
        changed
    }

    /// Back to the placeholder for terminal buttons bound to `name`.
    pub fn release_switch(&mut self, name: &str) -> Vec<usize> {
        let mut changed = Vec::new();
        for (pos, widget) in &mut self.widgets {
            if let Widget::Terminal(b) = widget {
                if b.device == name && b.handle.take().is_some() {
                    b.state = false;
                    b.face = theme::placeholder(Some(false));
                    changed.push(*pos);
                }
            }
        }
        changed
    }

    /// Re-read live values for resolved buttons bound to `name`.
    pub fn refresh(&mut self, name: &str) -> Vec<usize> {
        let mut changed = Vec::new();
        for (pos, widget) in &mut self.widgets {
            let updated = match widget {
                Widget::Rotator(b) if b.device == name => b.refresh(),
                Widget::Terminal(b) if b.device == name => b.refresh(),
                _ => false,
            };
            if updated {
                changed.push(*pos);
            }
        }
        changed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn label(position: usize) -> ButtonLayout {
        ButtonLayout::Label {
            position,
            text: "X".into(),
            next: None,
        }
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let buttons = vec![
            label(1),
            ButtonLayout::Rotator {
                position: 1,
                device: "Tower 1".into(),
                next: None,
            },
        ];
        let err = ButtonSet::from_layout("main", &buttons, 15).err().unwrap();
        assert!(matches!(
            err,
            DeckError::DuplicatePosition { position: 1, .. }
        ));
    }

    #[test]
    fn position_outside_surface_is_rejected() {
        let err = ButtonSet::from_layout("main", &[label(15)], 15)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DeckError::PositionOutOfRange {
                position: 15,
                buttons: 15,
                ..
            }
        ));
    }

    #[test]
    fn device_buttons_start_as_placeholders() {
        let buttons = vec![
            ButtonLayout::Rotator {
                position: 0,
                device: "Tower 1".into(),
                next: None,
            },
            ButtonLayout::Terminal {
                position: 1,
                device: "SM".into(),
                port: "SM".into(),
                terminal: "OB11".into(),
                text: None,
                next: None,
            },
        ];
        let set = ButtonSet::from_layout("main", &buttons, 15).unwrap();
        assert_eq!(set.face(0).unwrap().text, theme::PLACEHOLDER);
        assert_eq!(set.face(1).unwrap().led, Some(false));
        assert_eq!(set.bound_devices(), vec!["SM".to_owned(), "Tower 1".to_owned()]);
    }
}
