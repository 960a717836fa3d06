// ── Device hub ──
//
// Name-keyed registry of live rotators and switches plus the status
// subscriber list. One read/write lock guards both; reads hand out cloned
// handles so callers never iterate under the lock.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Device, DeviceKind, Rotator, StatusEvent, Switch};

/// Receiver of hub status events.
///
/// Every delivery runs on its own task, so a slow subscriber never holds up
/// the hub or its peers. No ordering is guaranteed between deliveries.
#[async_trait]
pub trait StatusSubscriber: Send + Sync {
    async fn on_status(&self, event: StatusEvent);
}

#[async_trait]
impl<F> StatusSubscriber for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    async fn on_status(&self, event: StatusEvent) {
        self(event);
    }
}

#[derive(Default)]
struct HubState {
    rotators: HashMap<String, Device>,
    switches: HashMap<String, Device>,
    /// Held weakly: a subscriber dropped by its owner is pruned on the next
    /// broadcast.
    subscribers: HashMap<String, Weak<dyn StatusSubscriber>>,
}

impl HubState {
    fn table(&self, kind: DeviceKind) -> &HashMap<String, Device> {
        match kind {
            DeviceKind::Rotator => &self.rotators,
            DeviceKind::Switch => &self.switches,
        }
    }

    fn table_mut(&mut self, kind: DeviceKind) -> &mut HashMap<String, Device> {
        match kind {
            DeviceKind::Rotator => &mut self.rotators,
            DeviceKind::Switch => &mut self.switches,
        }
    }

    /// Spawn one delivery task per live subscriber, pruning dead ones.
    fn dispatch(&mut self, event: &StatusEvent) {
        self.subscribers.retain(|name, subscriber| {
            let Some(subscriber) = subscriber.upgrade() else {
                warn!(subscriber = %name, "removed orphaned status subscriber");
                return false;
            };
            let event = event.clone();
            tokio::spawn(async move {
                subscriber.on_status(event).await;
            });
            true
        });
    }
}

/// In-process registry of live devices and their status subscribers.
///
/// Shared as `Arc<DeviceHub>` and handed to every component that needs it.
/// Must be used from within a tokio runtime: broadcasts spawn tasks.
#[derive(Default)]
pub struct DeviceHub {
    state: RwLock<HubState>,
}

impl DeviceHub {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ─────────────────────────────────────────────

    /// Register a device under its name. Names are unique per kind; a
    /// duplicate is rejected without touching the existing entry.
    pub async fn register(&self, device: Device) -> Result<(), CoreError> {
        let kind = device.kind();
        let name = device.name().to_owned();

        let mut state = self.state.write().await;
        let table = state.table_mut(kind);
        if table.contains_key(&name) {
            return Err(CoreError::DuplicateName { kind, name });
        }
        table.insert(name.clone(), device);
        state.dispatch(&StatusEvent::add(name.as_str()));

        info!(%kind, device = %name, "added device");
        Ok(())
    }

    /// Close `device` and remove it from the hub.
    ///
    /// The device is always closed. The registry entry is only removed (and
    /// `Remove` broadcast) when it is this very instance, so a late call for
    /// a replaced proxy leaves its successor alone. Returns whether an entry
    /// was removed.
    pub async fn unregister(&self, device: &Device) -> bool {
        device.close();

        let kind = device.kind();
        let name = device.name();

        let mut state = self.state.write().await;
        let table = state.table_mut(kind);
        let registered = table
            .get(name)
            .is_some_and(|existing| existing.same_instance(device));
        if !registered {
            debug!(%kind, device = %name, "unregister: not registered");
            return false;
        }
        table.remove(name);
        state.dispatch(&StatusEvent::remove(name));

        info!(%kind, device = %name, "removed device");
        true
    }

    // ── Lookup ───────────────────────────────────────────────────

    pub async fn lookup(&self, name: &str, kind: DeviceKind) -> Option<Device> {
        self.state.read().await.table(kind).get(name).cloned()
    }

    pub async fn rotator(&self, name: &str) -> Option<Arc<dyn Rotator>> {
        self.lookup(name, DeviceKind::Rotator)
            .await
            .and_then(|d| d.as_rotator().cloned())
    }

    pub async fn switch(&self, name: &str) -> Option<Arc<dyn Switch>> {
        self.lookup(name, DeviceKind::Switch)
            .await
            .and_then(|d| d.as_switch().cloned())
    }

    /// Snapshot of all devices of one kind, sorted by name.
    pub async fn list(&self, kind: DeviceKind) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .state
            .read()
            .await
            .table(kind)
            .values()
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.name().cmp(b.name()));
        devices
    }

    pub async fn rotators(&self) -> Vec<Arc<dyn Rotator>> {
        self.list(DeviceKind::Rotator)
            .await
            .iter()
            .filter_map(|d| d.as_rotator().cloned())
            .collect()
    }

    pub async fn switches(&self) -> Vec<Arc<dyn Switch>> {
        self.list(DeviceKind::Switch)
            .await
            .iter()
            .filter_map(|d| d.as_switch().cloned())
            .collect()
    }

    pub async fn device_count(&self, kind: DeviceKind) -> usize {
        self.state.read().await.table(kind).len()
    }

    // ── Status fan-out ───────────────────────────────────────────

    pub async fn subscribe(
        &self,
        name: impl Into<String>,
        subscriber: Weak<dyn StatusSubscriber>,
    ) -> Result<(), CoreError> {
        let name = name.into();
        let mut state = self.state.write().await;
        if state.subscribers.contains_key(&name) {
            return Err(CoreError::DuplicateSubscriber { name });
        }
        debug!(subscriber = %name, "status subscriber added");
        state.subscribers.insert(name, subscriber);
        Ok(())
    }

    /// Returns whether a subscriber with that name existed.
    pub async fn unsubscribe(&self, name: &str) -> bool {
        self.state.write().await.subscribers.remove(name).is_some()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    /// Send `event` to every subscriber. Proxies use this to announce
    /// `Update`s; `Add`/`Remove` are emitted by the hub itself.
    pub async fn broadcast(&self, event: StatusEvent) {
        self.state.write().await.dispatch(&event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::model::{Port, StatusKind};

    struct TestRotator {
        name: String,
        closed: AtomicUsize,
    }

    impl TestRotator {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                closed: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Rotator for TestRotator {
        fn name(&self) -> &str {
            &self.name
        }

        fn heading(&self) -> u16 {
            0
        }

        async fn set_heading(&self, _heading: u16) -> Result<(), CoreError> {
            Ok(())
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TestSwitch {
        name: String,
    }

    #[async_trait]
    impl Switch for TestSwitch {
        fn name(&self) -> &str {
            &self.name
        }

        fn ports(&self) -> Vec<Port> {
            Vec::new()
        }

        async fn set_port(&self, _port: Port) -> Result<(), CoreError> {
            Ok(())
        }

        fn close(&self) {}
    }

    fn rotator_device(r: &Arc<TestRotator>) -> Device {
        Device::Rotator(r.clone())
    }

    type Recorder = Arc<Mutex<Vec<StatusEvent>>>;

    fn recorder() -> (Recorder, Arc<dyn StatusSubscriber>) {
        let seen: Recorder = Arc::default();
        let sink = seen.clone();
        let subscriber: Arc<dyn StatusSubscriber> = Arc::new(move |ev: StatusEvent| {
            sink.lock().unwrap().push(ev);
        });
        (seen, subscriber)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_and_keeps_first() {
        let hub = DeviceHub::new();
        let first = TestRotator::new("Tower1");
        let second = TestRotator::new("Tower1");

        hub.register(rotator_device(&first)).await.unwrap();
        let err = hub.register(rotator_device(&second)).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { kind: DeviceKind::Rotator, .. }));

        let stored = hub.lookup("Tower1", DeviceKind::Rotator).await.unwrap();
        assert!(stored.same_instance(&rotator_device(&first)));
        assert_eq!(hub.device_count(DeviceKind::Rotator).await, 1);
    }

    #[tokio::test]
    async fn same_name_in_both_kinds_is_allowed() {
        let hub = DeviceHub::new();
        hub.register(rotator_device(&TestRotator::new("Tower1")))
            .await
            .unwrap();
        hub.register(Device::Switch(Arc::new(TestSwitch {
            name: "Tower1".into(),
        })))
        .await
        .unwrap();

        assert!(hub.rotator("Tower1").await.is_some());
        assert!(hub.switch("Tower1").await.is_some());
    }

    #[tokio::test]
    async fn unregister_unknown_device_still_closes_it() {
        let hub = DeviceHub::new();
        let (seen, subscriber) = recorder();
        hub.subscribe("ui", Arc::downgrade(&subscriber)).await.unwrap();

        let stray = TestRotator::new("Ghost");
        assert!(!hub.unregister(&rotator_device(&stray)).await);
        assert_eq!(stray.closed.load(Ordering::SeqCst), 1);

        settle().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregister_ignores_replaced_instance() {
        let hub = DeviceHub::new();
        let old = TestRotator::new("Tower1");
        let new = TestRotator::new("Tower1");

        hub.register(rotator_device(&old)).await.unwrap();
        assert!(hub.unregister(&rotator_device(&old)).await);
        hub.register(rotator_device(&new)).await.unwrap();

        // A late teardown of the old proxy must not evict its successor.
        assert!(!hub.unregister(&rotator_device(&old)).await);
        let stored = hub.lookup("Tower1", DeviceKind::Rotator).await.unwrap();
        assert!(stored.same_instance(&rotator_device(&new)));
    }

    #[tokio::test]
    async fn register_and_unregister_broadcast() {
        let hub = DeviceHub::new();
        let (seen, subscriber) = recorder();
        hub.subscribe("ui", Arc::downgrade(&subscriber)).await.unwrap();

        let r = TestRotator::new("Tower1");
        hub.register(rotator_device(&r)).await.unwrap();
        settle().await;
        hub.unregister(&rotator_device(&r)).await;
        settle().await;

        let kinds: Vec<StatusKind> = seen.lock().unwrap().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![StatusKind::Add, StatusKind::Remove]);
    }

    #[tokio::test]
    async fn duplicate_subscriber_is_rejected() {
        let hub = DeviceHub::new();
        let (_, subscriber) = recorder();
        hub.subscribe("ui", Arc::downgrade(&subscriber)).await.unwrap();
        let err = hub
            .subscribe("ui", Arc::downgrade(&subscriber))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSubscriber { .. }));

        assert!(hub.unsubscribe("ui").await);
        assert!(!hub.unsubscribe("ui").await);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_on_broadcast() {
        let hub = DeviceHub::new();
        let (_, subscriber) = recorder();
        hub.subscribe("gone", Arc::downgrade(&subscriber)).await.unwrap();
        drop(subscriber);

        hub.broadcast(StatusEvent::update("Tower1")).await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn list_is_sorted_snapshot() {
        let hub = DeviceHub::new();
        for name in ["Tower3", "Tower1", "Tower2"] {
            hub.register(rotator_device(&TestRotator::new(name)))
                .await
                .unwrap();
        }
        let names: Vec<String> = hub
            .rotators()
            .await
            .iter()
            .map(|r| r.name().to_owned())
            .collect();
        assert_eq!(names, vec!["Tower1", "Tower2", "Tower3"]);
    }
}
