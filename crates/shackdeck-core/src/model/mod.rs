// ── Domain model ──

mod device;
mod event;

pub use device::{Device, DeviceKind, MAX_HEADING, Port, Rotator, Switch, Terminal};
pub use event::{StatusEvent, StatusKind};
