// ── Service discovery ──
//
// Registry seams, service-name handling, the staleness cache, and the
// watcher that drives hub registration from them.

mod backoff;
mod cache;
mod naming;
mod registry;
mod watcher;

pub use backoff::ReconnectConfig;
pub use cache::ServiceCache;
pub use naming::{ServicePrefixes, display_name, service_segment};
pub use registry::{
    ChangeStream, ProxyFactory, ProxySpec, Registry, RegistryAction, RegistryChange, Service,
};
pub use watcher::{DiscoveryConfig, DiscoveryWatcher};
