// ── Device status events ──

use serde::{Deserialize, Serialize};

/// What happened to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusKind {
    /// The device was registered with the hub.
    Add,
    /// The device was removed from the hub.
    Remove,
    /// The device reported a state change. Emitted by proxies, never by
    /// the hub itself.
    Update,
}

/// Fan-out notification sent to every hub subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: StatusKind,
    pub device: String,
}

impl StatusEvent {
    pub fn new(kind: StatusKind, device: impl Into<String>) -> Self {
        Self {
            kind,
            device: device.into(),
        }
    }

    pub fn add(device: impl Into<String>) -> Self {
        Self::new(StatusKind::Add, device)
    }

    pub fn remove(device: impl Into<String>) -> Self {
        Self::new(StatusKind::Remove, device)
    }

    pub fn update(device: impl Into<String>) -> Self {
        Self::new(StatusKind::Update, device)
    }
}
