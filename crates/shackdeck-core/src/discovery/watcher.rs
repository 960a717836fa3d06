// ── Discovery watcher ──
//
// Bridges the registry's list/watch feed to hub registration. Three paths
// can retire a proxy: an explicit delete record, TTL expiry in the cache,
// and the proxy's own done signal. All of them end in `DeviceHub::unregister`,
// which is idempotent per instance, so whichever fires first wins.
//
// Display names are not unique across services: `north.Mast` and
// `south.Mast` share the hub key `Mast`. Each registered device is owned by
// the service that brought it up, and only that service retires it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::backoff::{ReconnectConfig, calculate_backoff};
use super::cache::ServiceCache;
use super::naming::{ServicePrefixes, display_name};
use super::registry::{ProxyFactory, ProxySpec, Registry, RegistryAction, RegistryChange};
use crate::error::CoreError;
use crate::hub::DeviceHub;
use crate::model::{Device, DeviceKind};

/// Runtime settings for [`DiscoveryWatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    pub prefixes: ServicePrefixes,
    /// Age at which an unrefreshed service counts as deleted. Default: 20s.
    pub ttl: Duration,
    /// Cache sweep period while the feed is quiet. Default: 5s.
    pub sweep_interval: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            prefixes: ServicePrefixes::default(),
            ttl: Duration::from_secs(20),
            sweep_interval: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
        }
    }
}

struct WatcherInner {
    hub: Arc<DeviceHub>,
    registry: Arc<dyn Registry>,
    factory: Arc<dyn ProxyFactory>,
    cache: ServiceCache,
    /// service name -> the device instance it registered.
    owners: Mutex<HashMap<String, Device>>,
    config: DiscoveryConfig,
}

impl WatcherInner {
    /// Forget `service`'s device if it is still `device`.
    async fn disown(&self, service: &str, device: &Device) {
        let mut owners = self.owners.lock().await;
        if owners.get(service).is_some_and(|d| d.same_instance(device)) {
            owners.remove(service);
        }
    }
}

/// Keeps the hub in step with the discovery registry.
///
/// Cheaply cloneable; clones share the same cache.
#[derive(Clone)]
pub struct DiscoveryWatcher {
    inner: Arc<WatcherInner>,
}

impl DiscoveryWatcher {
    pub fn new(
        hub: Arc<DeviceHub>,
        registry: Arc<dyn Registry>,
        factory: Arc<dyn ProxyFactory>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                hub,
                registry,
                factory,
                cache: ServiceCache::new(config.ttl),
                owners: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    pub fn cache(&self) -> &ServiceCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.inner.config
    }

    // ── Startup enumeration ──────────────────────────────────────

    /// List every registered service and bring up a proxy for each managed
    /// one. Individual proxy failures are logged and skipped; only a failed
    /// listing is an error. Returns the number of devices registered.
    pub async fn enumerate(&self) -> Result<usize, CoreError> {
        let services = self.inner.registry.list_services().await?;
        let mut added = 0;

        for service in services {
            let Some(kind) = self.inner.config.prefixes.classify(&service.name) else {
                trace!(service = %service.name, "ignoring unmanaged service");
                continue;
            };
            match self.add_service(kind, &service.name).await {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!(service = %service.name, error = %e, "failed to bring up device"),
            }
        }

        info!(added, "initial service enumeration complete");
        Ok(added)
    }

    // ── Change records ───────────────────────────────────────────

    /// Handle one registry record, then sweep the cache.
    pub async fn apply(&self, change: RegistryChange) {
        self.handle_record(&change).await;
        self.sweep().await;
    }

    async fn handle_record(&self, change: &RegistryChange) {
        let Some(kind) = self.inner.config.prefixes.classify(&change.service) else {
            trace!(service = %change.service, action = %change.action, "ignoring unmanaged service");
            return;
        };

        match change.action {
            RegistryAction::Create | RegistryAction::Update => {
                if let Err(e) = self.add_service(kind, &change.service).await {
                    warn!(service = %change.service, error = %e, "failed to bring up device");
                }
            }
            RegistryAction::Delete => {
                self.remove_service(kind, &change.service).await;
            }
        }
    }

    /// Bring up a proxy for `service` unless its device is already known,
    /// in which case only the cache timestamp is refreshed. Returns whether
    /// a new device was registered.
    ///
    /// Nothing is cached when construction or registration fails, so the
    /// next record for the service retries.
    pub async fn add_service(&self, kind: DeviceKind, service: &str) -> Result<bool, CoreError> {
        let inner = &self.inner;
        let device_name = display_name(service);

        if inner.hub.lookup(&device_name, kind).await.is_some() {
            inner.cache.stamp(service).await;
            return Ok(false);
        }

        let done = CancellationToken::new();
        let spec = ProxySpec {
            display_name: device_name.clone(),
            service_name: service.to_owned(),
            done: done.clone(),
        };
        let device = match kind {
            DeviceKind::Rotator => Device::Rotator(inner.factory.rotator(spec).await?),
            DeviceKind::Switch => Device::Switch(inner.factory.switch(spec).await?),
        };

        if let Err(e) = inner.hub.register(device.clone()).await {
            device.close();
            done.cancel();
            return Err(e);
        }
        inner.cache.stamp(service).await;
        inner
            .owners
            .lock()
            .await
            .insert(service.to_owned(), device.clone());
        self.spawn_waiter(service, device, done);

        debug!(%kind, %service, device = %device_name, "proxy started");
        Ok(true)
    }

    /// Tear down the device `service` brought up and forget the service.
    /// A device registered by another service under the same display name
    /// is left alone. Returns whether a hub entry was removed.
    pub async fn remove_service(&self, kind: DeviceKind, service: &str) -> bool {
        let inner = &self.inner;
        inner.cache.remove(service).await;

        let owned = inner.owners.lock().await.remove(service);
        match owned {
            Some(device) => inner.hub.unregister(&device).await,
            None => {
                debug!(%kind, %service, "delete for service without a device");
                false
            }
        }
    }

    /// Waits out the proxy's connection and unregisters it when it dies.
    fn spawn_waiter(&self, service: &str, device: Device, done: CancellationToken) {
        let inner = Arc::clone(&self.inner);
        let service = service.to_owned();
        tokio::spawn(async move {
            done.cancelled().await;
            debug!(device = %device.name(), %service, "proxy connection closed");
            inner.hub.unregister(&device).await;
            inner.disown(&service, &device).await;
        });
    }

    // ── Staleness ────────────────────────────────────────────────

    /// Treat every cache entry older than the TTL as deleted. Returns the
    /// number of services expired.
    pub async fn sweep(&self) -> usize {
        let expired = self.inner.cache.take_expired().await;
        let count = expired.len();

        for service in expired {
            let Some(kind) = self.inner.config.prefixes.classify(&service) else {
                continue;
            };
            info!(%service, "service expired");
            self.remove_service(kind, &service).await;
        }
        count
    }

    // ── Watch loop ───────────────────────────────────────────────

    /// Run on a background task until `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let watcher = self.clone();
        tokio::spawn(async move { watcher.run(cancel).await })
    }

    /// Follow the registry's change feed until `cancel` fires, re-subscribing
    /// with backoff whenever the feed fails or ends.
    pub async fn run(&self, cancel: CancellationToken) {
        let reconnect = &self.inner.config.reconnect;
        let period = self.inner.config.sweep_interval;
        let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: u32 = 0;

        loop {
            match self.watch_once(&cancel, &mut sweep).await {
                Ok(_) if cancel.is_cancelled() => break,
                Ok(records) => {
                    info!(records, "registry watch ended, resubscribing");
                    if records > 0 {
                        attempt = 0;
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "registry watch failed");
                    if let Some(max) = reconnect.max_retries {
                        if attempt >= max {
                            error!(max_retries = max, "registry watch retry limit reached, giving up");
                            break;
                        }
                    }
                }
            }

            let delay = calculate_backoff(attempt, reconnect);
            debug!(delay_ms = delay.as_millis(), attempt, "waiting before resubscribing");

            let wake = tokio::time::sleep(delay);
            tokio::pin!(wake);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    () = &mut wake => break,
                    _ = sweep.tick() => { self.sweep().await; }
                }
            }
            attempt = attempt.saturating_add(1);
        }

        debug!("discovery watcher exiting");
    }

    /// One subscription's lifetime. Returns the number of records handled.
    async fn watch_once(
        &self,
        cancel: &CancellationToken,
        sweep: &mut Interval,
    ) -> Result<usize, CoreError> {
        let mut changes = self.inner.registry.watch().await?;
        info!("watching registry for changes");
        let mut records = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(records),
                _ = sweep.tick() => {
                    self.sweep().await;
                }
                change = changes.next() => match change {
                    Some(Ok(change)) => {
                        records += 1;
                        self.apply(change).await;
                    }
                    Some(Err(e)) => warn!(error = %e, "bad registry record"),
                    None => return Ok(records),
                },
            }
        }
    }
}
