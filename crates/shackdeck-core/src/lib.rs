//! Live device registry and service discovery for the shackdeck button
//! surface.
//!
//! - **[`DeviceHub`]**: Name-keyed registry of remote rotators and switches.
//!   Registration and removal broadcast [`StatusEvent`]s to every
//!   [`StatusSubscriber`], each delivery on its own task.
//!
//! - **[`DiscoveryWatcher`]**: Follows the discovery registry's list/watch
//!   feed, builds device proxies through a [`ProxyFactory`], and retires them
//!   on delete records, TTL expiry ([`ServiceCache`]), or connection loss.
//!
//! - **Domain model** ([`model`]): [`Device`] is a closed enum over the
//!   [`Rotator`] and [`Switch`] capability traits.

pub mod discovery;
pub mod error;
pub mod hub;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use discovery::{
    ChangeStream, DiscoveryConfig, DiscoveryWatcher, ProxyFactory, ProxySpec, ReconnectConfig,
    Registry, RegistryAction, RegistryChange, Service, ServiceCache, ServicePrefixes,
};
pub use error::CoreError;
pub use hub::{DeviceHub, StatusSubscriber};
pub use model::{
    Device, DeviceKind, MAX_HEADING, Port, Rotator, StatusEvent, StatusKind, Switch, Terminal,
};
