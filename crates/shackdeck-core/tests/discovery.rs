#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use shackdeck_core::{
    ChangeStream, CoreError, DeviceHub, DeviceKind, DiscoveryConfig, DiscoveryWatcher, Port,
    ProxyFactory, ProxySpec, Registry, RegistryAction, RegistryChange, Rotator, Service,
    StatusEvent, StatusKind, StatusSubscriber, Switch,
};

// ── Fakes ────────────────────────────────────────────────────────────

struct FakeRotator {
    name: String,
    done: CancellationToken,
    closed: AtomicUsize,
}

#[async_trait]
impl Rotator for FakeRotator {
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
        self.done.cancel();
    }
}

struct FakeSwitch {
    name: String,
    done: CancellationToken,
}

#[async_trait]
impl Switch for FakeSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }

    async fn set_port(&self, _port: Port) -> Result<(), CoreError> {
        Ok(())
    }

    fn close(&self) {
        self.done.cancel();
    }
}

#[derive(Default)]
struct FakeFactory {
    rotators: Mutex<HashMap<String, Arc<FakeRotator>>>,
    built: AtomicUsize,
    refuse: Mutex<HashSet<String>>,
}

impl FakeFactory {
    fn rotator_proxy(&self, display: &str) -> Arc<FakeRotator> {
        self.rotators.lock().unwrap()[display].clone()
    }

    fn check(&self, spec: &ProxySpec) -> Result<(), CoreError> {
        if self.refuse.lock().unwrap().contains(&spec.display_name) {
            return Err(CoreError::ProxyConstruction {
                service: spec.service_name.clone(),
                reason: "connection refused".into(),
            });
        }
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProxyFactory for FakeFactory {
    async fn rotator(&self, spec: ProxySpec) -> Result<Arc<dyn Rotator>, CoreError> {
        self.check(&spec)?;
        let proxy = Arc::new(FakeRotator {
            name: spec.display_name.clone(),
            done: spec.done,
            closed: AtomicUsize::new(0),
        });
        self.rotators
            .lock()
            .unwrap()
            .insert(spec.display_name, proxy.clone());
        Ok(proxy)
    }

    async fn switch(&self, spec: ProxySpec) -> Result<Arc<dyn Switch>, CoreError> {
        self.check(&spec)?;
        Ok(Arc::new(FakeSwitch {
            name: spec.display_name,
            done: spec.done,
        }))
    }
}

type Feed = mpsc::UnboundedSender<Result<RegistryChange, CoreError>>;

/// Registry whose `watch` hands out pre-queued feeds, one per call.
#[derive(Default)]
struct ScriptedRegistry {
    services: Vec<Service>,
    feeds: Mutex<VecDeque<UnboundedReceiverStream<Result<RegistryChange, CoreError>>>>,
    watches: AtomicUsize,
}

impl ScriptedRegistry {
    fn with_services(names: &[&str]) -> Self {
        Self {
            services: names.iter().map(|n| Service::new(*n)).collect(),
            ..Self::default()
        }
    }

    fn queue_feed(&self) -> Feed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds
            .lock()
            .unwrap()
            .push_back(UnboundedReceiverStream::new(rx));
        tx
    }
}

#[async_trait]
impl Registry for ScriptedRegistry {
    async fn list_services(&self) -> Result<Vec<Service>, CoreError> {
        Ok(self.services.clone())
    }

    async fn watch(&self) -> Result<ChangeStream, CoreError> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        match self.feeds.lock().unwrap().pop_front() {
            Some(feed) => Ok(feed.boxed()),
            None => Err(CoreError::Registry {
                message: "watch unavailable".into(),
            }),
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────────

struct Harness {
    hub: Arc<DeviceHub>,
    registry: Arc<ScriptedRegistry>,
    factory: Arc<FakeFactory>,
    watcher: DiscoveryWatcher,
    events: Arc<Mutex<Vec<StatusEvent>>>,
    _subscriber: Arc<dyn StatusSubscriber>,
}

async fn harness(registry: ScriptedRegistry) -> Harness {
    let hub = Arc::new(DeviceHub::new());
    let registry = Arc::new(registry);
    let factory = Arc::new(FakeFactory::default());
    let watcher = DiscoveryWatcher::new(
        hub.clone(),
        registry.clone(),
        factory.clone(),
        DiscoveryConfig::default(),
    );

    let events: Arc<Mutex<Vec<StatusEvent>>> = Arc::default();
    let sink = events.clone();
    let subscriber: Arc<dyn StatusSubscriber> = Arc::new(move |ev: StatusEvent| {
        sink.lock().unwrap().push(ev);
    });
    hub.subscribe("test", Arc::downgrade(&subscriber))
        .await
        .unwrap();

    Harness {
        hub,
        registry,
        factory,
        watcher,
        events,
        _subscriber: subscriber,
    }
}

impl Harness {
    fn count(&self, kind: StatusKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn create(service: &str) -> RegistryChange {
    RegistryChange::new(RegistryAction::Create, service)
}

// ── Enumeration ──────────────────────────────────────────────────────

#[tokio::test]
async fn enumerate_registers_managed_services_only() {
    let h = harness(ScriptedRegistry::with_services(&[
        "shackbus.rotator.Tower_1",
        "shackbus.switch.Stack_Match",
        "shackbus.radio.IC7300",
    ]))
    .await;

    assert_eq!(h.watcher.enumerate().await.unwrap(), 2);
    assert!(h.hub.rotator("Tower 1").await.is_some());
    assert!(h.hub.switch("Stack Match").await.is_some());
    assert_eq!(h.hub.device_count(DeviceKind::Rotator).await, 1);
    assert!(h.watcher.cache().contains("shackbus.rotator.Tower_1").await);
    assert!(!h.watcher.cache().contains("shackbus.radio.IC7300").await);
}

// ── Change records ───────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_device_registered_under_display_name() {
    let h = harness(ScriptedRegistry::default()).await;

    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;
    assert!(h.hub.rotator("Tower 1").await.is_some());

    h.watcher
        .apply(RegistryChange::new(
            RegistryAction::Delete,
            "shackbus.rotator.Tower_1",
        ))
        .await;
    assert!(h.hub.rotator("Tower 1").await.is_none());
    assert!(!h.watcher.cache().contains("shackbus.rotator.Tower_1").await);
    assert!(h.factory.rotator_proxy("Tower 1").closed.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(start_paused = true)]
async fn unrefreshed_service_expires_exactly_once() {
    let h = harness(ScriptedRegistry::default()).await;
    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;

    tokio::time::advance(Duration::from_secs(19)).await;
    assert_eq!(h.watcher.sweep().await, 0);
    assert!(h.hub.rotator("Tower 1").await.is_some());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(h.watcher.sweep().await, 1);
    assert!(h.hub.rotator("Tower 1").await.is_none());

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(h.watcher.sweep().await, 0);
    settle().await;
    assert_eq!(h.count(StatusKind::Add), 1);
    assert_eq!(h.count(StatusKind::Remove), 1);
}

#[tokio::test(start_paused = true)]
async fn update_of_known_service_only_refreshes() {
    let h = harness(ScriptedRegistry::default()).await;
    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;

    tokio::time::advance(Duration::from_secs(15)).await;
    h.watcher
        .apply(RegistryChange::new(
            RegistryAction::Update,
            "shackbus.rotator.Tower_1",
        ))
        .await;
    tokio::time::advance(Duration::from_secs(15)).await;

    assert_eq!(h.watcher.sweep().await, 0);
    assert!(h.hub.rotator("Tower 1").await.is_some());
    assert_eq!(h.factory.built.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_display_name_is_retired_only_by_its_owner() {
    let h = harness(ScriptedRegistry::default()).await;
    h.watcher.apply(create("shackbus.rotator.north.Mast")).await;
    h.watcher.apply(create("shackbus.rotator.south.Mast")).await;
    assert_eq!(h.factory.built.load(Ordering::SeqCst), 1);

    h.watcher
        .apply(RegistryChange::new(
            RegistryAction::Delete,
            "shackbus.rotator.south.Mast",
        ))
        .await;
    assert!(h.hub.rotator("Mast").await.is_some());
    assert!(h.watcher.cache().contains("shackbus.rotator.north.Mast").await);

    // north keeps being announced, south reappears once and goes quiet.
    h.watcher.apply(create("shackbus.rotator.south.Mast")).await;
    tokio::time::advance(Duration::from_secs(15)).await;
    h.watcher.apply(create("shackbus.rotator.north.Mast")).await;
    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(h.watcher.sweep().await, 1);
    assert!(h.hub.rotator("Mast").await.is_some());
    assert_eq!(h.factory.rotator_proxy("Mast").closed.load(Ordering::SeqCst), 0);

    h.watcher
        .apply(RegistryChange::new(
            RegistryAction::Delete,
            "shackbus.rotator.north.Mast",
        ))
        .await;
    assert!(h.hub.rotator("Mast").await.is_none());
}

#[tokio::test]
async fn failed_construction_is_retried_on_next_record() {
    let h = harness(ScriptedRegistry::default()).await;
    h.factory.refuse.lock().unwrap().insert("Tower 1".into());

    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;
    assert!(h.hub.rotator("Tower 1").await.is_none());
    assert!(!h.watcher.cache().contains("shackbus.rotator.Tower_1").await);

    h.factory.refuse.lock().unwrap().clear();
    h.watcher
        .apply(RegistryChange::new(
            RegistryAction::Update,
            "shackbus.rotator.Tower_1",
        ))
        .await;
    assert!(h.hub.rotator("Tower 1").await.is_some());
}

// ── Connection loss ──────────────────────────────────────────────────

#[tokio::test]
async fn done_signal_unregisters_and_later_delete_is_noop() {
    let h = harness(ScriptedRegistry::default()).await;
    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;

    // Connection drops without anyone calling close().
    h.factory.rotator_proxy("Tower 1").done.cancel();
    settle().await;
    assert!(h.hub.rotator("Tower 1").await.is_none());

    assert!(
        !h.watcher
            .remove_service(DeviceKind::Rotator, "shackbus.rotator.Tower_1")
            .await
    );
    settle().await;
    assert_eq!(h.count(StatusKind::Remove), 1);
}

#[tokio::test]
async fn stale_waiter_does_not_remove_replacement() {
    let h = harness(ScriptedRegistry::default()).await;
    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;
    let first = h.factory.rotator_proxy("Tower 1");

    h.watcher
        .remove_service(DeviceKind::Rotator, "shackbus.rotator.Tower_1")
        .await;
    h.watcher.apply(create("shackbus.rotator.Tower_1")).await;
    settle().await;

    assert!(first.done.is_cancelled());
    assert!(h.hub.rotator("Tower 1").await.is_some());
    assert_eq!(h.factory.built.load(Ordering::SeqCst), 2);
}

// ── Watch loop ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn run_follows_feed_until_cancelled() {
    let h = harness(ScriptedRegistry::default()).await;
    let feed = h.registry.queue_feed();
    let cancel = CancellationToken::new();
    let handle = h.watcher.spawn(cancel.clone());

    feed.send(Ok(create("shackbus.switch.Stack_Match"))).unwrap();
    feed.send(Err(CoreError::Registry {
        message: "garbled".into(),
    }))
    .unwrap();
    feed.send(Ok(create("shackbus.rotator.Tower_1"))).unwrap();
    settle().await;

    assert!(h.hub.switch("Stack Match").await.is_some());
    assert!(h.hub.rotator("Tower 1").await.is_some());

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(h.registry.watches.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn run_resubscribes_after_feed_ends() {
    let h = harness(ScriptedRegistry::default()).await;
    drop(h.registry.queue_feed());
    let second = h.registry.queue_feed();
    let cancel = CancellationToken::new();
    let handle = h.watcher.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(3)).await;
    second.send(Ok(create("shackbus.rotator.Tower_1"))).unwrap();
    settle().await;

    assert_eq!(h.registry.watches.load(Ordering::SeqCst), 2);
    assert!(h.hub.rotator("Tower 1").await.is_some());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn quiet_feed_still_expires_entries() {
    let h = harness(ScriptedRegistry::default()).await;
    let feed = h.registry.queue_feed();
    let cancel = CancellationToken::new();
    let handle = h.watcher.spawn(cancel.clone());

    feed.send(Ok(create("shackbus.rotator.Tower_1"))).unwrap();
    settle().await;
    assert!(h.hub.rotator("Tower 1").await.is_some());

    tokio::time::sleep(Duration::from_secs(26)).await;
    settle().await;
    assert!(h.hub.rotator("Tower 1").await.is_none());

    cancel.cancel();
    handle.await.unwrap();
}
