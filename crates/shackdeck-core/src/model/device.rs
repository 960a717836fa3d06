// ── Device domain types ──

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Highest heading a rotator accepts (overlap rotators go past 360°).
pub const MAX_HEADING: u16 = 450;

/// The two device namespaces kept by the hub.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Rotator,
    Switch,
}

/// A remote antenna rotator reached through a proxy.
///
/// `heading()` returns the last value reported by the device and never
/// blocks; `set_heading()` goes over the transport.
#[async_trait]
pub trait Rotator: Send + Sync {
    fn name(&self) -> &str;

    fn heading(&self) -> u16;

    async fn set_heading(&self, heading: u16) -> Result<(), CoreError>;

    /// Tear down the proxy. Must be safe to call more than once.
    fn close(&self);
}

/// A remote relay switch reached through a proxy.
#[async_trait]
pub trait Switch: Send + Sync {
    fn name(&self) -> &str;

    /// Cached state of every port.
    fn ports(&self) -> Vec<Port>;

    /// Apply the terminal states listed in `port`. Terminals not listed keep
    /// their state.
    async fn set_port(&self, port: Port) -> Result<(), CoreError>;

    /// Tear down the proxy. Must be safe to call more than once.
    fn close(&self);

    fn port(&self, name: &str) -> Result<Port, CoreError> {
        self.ports()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CoreError::PortNotFound {
                device: self.name().to_owned(),
                port: name.to_owned(),
            })
    }
}

/// A named group of terminals on a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(default)]
    pub terminals: Vec<Terminal>,
}

/// A single relay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub name: String,
    #[serde(default)]
    pub state: bool,
}

impl Port {
    /// A port carrying a single terminal change, as sent by `set_port`.
    pub fn single(port: impl Into<String>, terminal: impl Into<String>, state: bool) -> Self {
        Self {
            name: port.into(),
            terminals: vec![Terminal {
                name: terminal.into(),
                state,
            }],
        }
    }

    pub fn terminal(&self, device: &str, name: &str) -> Result<&Terminal, CoreError> {
        self.terminals
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CoreError::TerminalNotFound {
                device: device.to_owned(),
                port: self.name.clone(),
                terminal: name.to_owned(),
            })
    }
}

/// A live device handle as stored in the hub.
///
/// Only `name()` and `close()` are shared; kind-specific operations are
/// reached by matching on the variant.
#[derive(Clone)]
pub enum Device {
    Rotator(Arc<dyn Rotator>),
    Switch(Arc<dyn Switch>),
}

impl Device {
    pub fn name(&self) -> &str {
        match self {
            Self::Rotator(r) => r.name(),
            Self::Switch(s) => s.name(),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Rotator(_) => DeviceKind::Rotator,
            Self::Switch(_) => DeviceKind::Switch,
        }
    }

    pub fn close(&self) {
        match self {
            Self::Rotator(r) => r.close(),
            Self::Switch(s) => s.close(),
        }
    }

    pub fn as_rotator(&self) -> Option<&Arc<dyn Rotator>> {
        match self {
            Self::Rotator(r) => Some(r),
            Self::Switch(_) => None,
        }
    }

    pub fn as_switch(&self) -> Option<&Arc<dyn Switch>> {
        match self {
            Self::Switch(s) => Some(s),
            Self::Rotator(_) => None,
        }
    }

    /// Whether both handles point at the same proxy object.
    pub fn same_instance(&self, other: &Device) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    // Compare data addresses only; vtable pointers are not unique.
    fn data_ptr(&self) -> *const () {
        match self {
            Self::Rotator(r) => Arc::as_ptr(r).cast::<()>(),
            Self::Switch(s) => Arc::as_ptr(s).cast::<()>(),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

impl From<Arc<dyn Rotator>> for Device {
    fn from(r: Arc<dyn Rotator>) -> Self {
        Self::Rotator(r)
    }
}

impl From<Arc<dyn Switch>> for Device {
    fn from(s: Arc<dyn Switch>) -> Self {
        Self::Switch(s)
    }
}
