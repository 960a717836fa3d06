// ── Discovery registry and proxy seams ──
//
// The service registry and the RPC transport live outside this crate.
// These traits describe exactly what the watcher needs from them.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::{Rotator, Switch};

/// A service as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegistryAction {
    Create,
    Update,
    Delete,
}

/// One record from the registry's change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryChange {
    pub action: RegistryAction,
    pub service: String,
}

impl RegistryChange {
    pub fn new(action: RegistryAction, service: impl Into<String>) -> Self {
        Self {
            action,
            service: service.into(),
        }
    }
}

/// Long-lived change feed. Errors are per record; the end of the stream
/// means the subscription was lost.
pub type ChangeStream = BoxStream<'static, Result<RegistryChange, CoreError>>;

/// Service-discovery registry.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>, CoreError>;

    async fn watch(&self) -> Result<ChangeStream, CoreError>;
}

/// Everything a proxy constructor is handed.
#[derive(Debug, Clone)]
pub struct ProxySpec {
    /// Hub key, e.g. `Tower 1`.
    pub display_name: String,
    /// Fully-qualified service name, e.g. `shackbus.rotator.Tower_1`.
    pub service_name: String,
    /// Cancelled by the proxy exactly when its connection terminates, for
    /// whatever reason, including `close()`.
    pub done: CancellationToken,
}

/// Builds device proxies that forward commands over the transport.
#[async_trait]
pub trait ProxyFactory: Send + Sync {
    async fn rotator(&self, spec: ProxySpec) -> Result<Arc<dyn Rotator>, CoreError>;

    async fn switch(&self, spec: ProxySpec) -> Result<Arc<dyn Switch>, CoreError>;
}
