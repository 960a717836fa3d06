// ── Short/long press classification ──
//
// Decided at release time from the stored press timestamp. There is no
// timer: a press whose release never arrives produces nothing.

use std::time::Duration;

use tokio::time::Instant;

use crate::surface::PressState;

/// Default long-press threshold.
pub const LONG_PRESS: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Press {
    Short,
    Long,
}

#[derive(Debug)]
pub struct PressTracker {
    threshold: Duration,
    pending: Option<(usize, Instant)>,
}

impl Default for PressTracker {
    fn default() -> Self {
        Self::new(LONG_PRESS)
    }
}

impl PressTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feed one surface event. Returns the classified press on a release
    /// that pairs with the stored press, `None` otherwise.
    pub fn track(&mut self, position: usize, state: PressState) -> Option<Press> {
        match state {
            PressState::Pressed => {
                self.pending = Some((position, Instant::now()));
                None
            }
            PressState::Released => {
                let (_, pressed_at) = self.pending.take_if(|(pressed, _)| *pressed == position)?;
                if pressed_at.elapsed() >= self.threshold {
                    Some(Press::Long)
                } else {
                    Some(Press::Short)
                }
            }
        }
    }
}
