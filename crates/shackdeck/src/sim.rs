//! In-process stand-ins for the discovery registry and the device proxies.
//!
//! [`SimRegistry`] announces every configured device and keeps re-announcing
//! it well inside the discovery TTL. [`SimFactory`] builds proxies that keep
//! their state in memory and report changes through the hub, the same way a
//! networked proxy relays state pushed by its remote device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use shackdeck_config::Simulation;
use shackdeck_core::{
    ChangeStream, CoreError, DeviceHub, DeviceKind, MAX_HEADING, Port, ProxyFactory, ProxySpec,
    Registry, RegistryAction, RegistryChange, Rotator, Service, ServicePrefixes, StatusEvent,
    Switch,
};

// ── Registry ────────────────────────────────────────────────────────

pub struct SimRegistry {
    services: Vec<String>,
    refresh: Duration,
}

impl SimRegistry {
    pub fn new(simulation: &Simulation, prefixes: &ServicePrefixes) -> Self {
        let rotators = simulation
            .rotators
            .iter()
            .map(|r| prefixes.service_name(DeviceKind::Rotator, &r.name));
        let switches = simulation
            .switches
            .iter()
            .map(|s| prefixes.service_name(DeviceKind::Switch, &s.name));
        Self {
            services: rotators.chain(switches).collect(),
            refresh: Duration::from_secs(simulation.refresh_secs.max(1)),
        }
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }
}

#[async_trait]
impl Registry for SimRegistry {
    async fn list_services(&self) -> Result<Vec<Service>, CoreError> {
        Ok(self.services.iter().map(Service::new).collect())
    }

    async fn watch(&self) -> Result<ChangeStream, CoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let services = self.services.clone();
        let refresh = self.refresh;

        tokio::spawn(async move {
            let mut action = RegistryAction::Create;
            let mut ticker = tokio::time::interval(refresh);
            loop {
                ticker.tick().await;
                for service in &services {
                    if tx.send(Ok(RegistryChange::new(action, service))).is_err() {
                        return;
                    }
                }
                action = RegistryAction::Update;
            }
        });

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

// ── Proxies ─────────────────────────────────────────────────────────

fn announce(hub: &Weak<DeviceHub>, device: &str) {
    let Some(hub) = hub.upgrade() else {
        return;
    };
    let event = StatusEvent::update(device);
    tokio::spawn(async move { hub.broadcast(event).await });
}

pub struct SimRotator {
    name: String,
    heading: AtomicU16,
    hub: Weak<DeviceHub>,
    done: CancellationToken,
}

#[async_trait]
impl Rotator for SimRotator {
    fn name(&self) -> &str {
        &self.name
    }

    fn heading(&self) -> u16 {
        self.heading.load(Ordering::Relaxed)
    }

    async fn set_heading(&self, heading: u16) -> Result<(), CoreError> {
        if self.done.is_cancelled() {
            return Err(CoreError::TransportFailure {
                device: self.name.clone(),
                reason: "connection closed".into(),
            });
        }
        if heading > MAX_HEADING {
            return Err(CoreError::OutOfRangeHeading {
                heading,
                max: MAX_HEADING,
            });
        }
        self.heading.store(heading, Ordering::Relaxed);
        info!(device = %self.name, heading, "rotator turned");
        announce(&self.hub, &self.name);
        Ok(())
    }

    fn close(&self) {
        self.done.cancel();
    }
}

pub struct SimSwitch {
    name: String,
    ports: Mutex<Vec<Port>>,
    hub: Weak<DeviceHub>,
    done: CancellationToken,
}

impl SimSwitch {
    fn apply(&self, command: &Port) -> Result<(), CoreError> {
        let mut ports = self.ports.lock().unwrap_or_else(PoisonError::into_inner);
        let port = ports
            .iter_mut()
            .find(|p| p.name == command.name)
            .ok_or_else(|| CoreError::PortNotFound {
                device: self.name.clone(),
                port: command.name.clone(),
            })?;

        for change in &command.terminals {
            let terminal = port
                .terminals
                .iter_mut()
                .find(|t| t.name == change.name)
                .ok_or_else(|| CoreError::TerminalNotFound {
                    device: self.name.clone(),
                    port: command.name.clone(),
                    terminal: change.name.clone(),
                })?;
            terminal.state = change.state;
        }
        Ok(())
    }
}

#[async_trait]
impl Switch for SimSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<Port> {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn set_port(&self, port: Port) -> Result<(), CoreError> {
        if self.done.is_cancelled() {
            return Err(CoreError::TransportFailure {
                device: self.name.clone(),
                reason: "connection closed".into(),
            });
        }
        self.apply(&port)?;
        info!(device = %self.name, port = %port.name, "switch port set");
        announce(&self.hub, &self.name);
        Ok(())
    }

    fn close(&self) {
        self.done.cancel();
    }
}

// ── Factory ─────────────────────────────────────────────────────────

/// Builds simulated proxies from the configured initial state.
pub struct SimFactory {
    hub: Weak<DeviceHub>,
    headings: HashMap<String, u16>,
    ports: HashMap<String, Vec<Port>>,
}

impl SimFactory {
    pub fn new(hub: &Arc<DeviceHub>, simulation: &Simulation) -> Self {
        Self {
            hub: Arc::downgrade(hub),
            headings: simulation
                .rotators
                .iter()
                .map(|r| (r.name.clone(), r.heading))
                .collect(),
            ports: simulation
                .switches
                .iter()
                .map(|s| (s.name.clone(), s.ports.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ProxyFactory for SimFactory {
    async fn rotator(&self, spec: ProxySpec) -> Result<Arc<dyn Rotator>, CoreError> {
        let heading = *self.headings.get(&spec.display_name).ok_or_else(|| {
            CoreError::ProxyConstruction {
                service: spec.service_name.clone(),
                reason: "no such simulated rotator".into(),
            }
        })?;
        debug!(service = %spec.service_name, "simulated rotator connected");
        Ok(Arc::new(SimRotator {
            name: spec.display_name,
            heading: AtomicU16::new(heading),
            hub: self.hub.clone(),
            done: spec.done,
        }))
    }

    async fn switch(&self, spec: ProxySpec) -> Result<Arc<dyn Switch>, CoreError> {
        let ports = self.ports.get(&spec.display_name).cloned().ok_or_else(|| {
            CoreError::ProxyConstruction {
                service: spec.service_name.clone(),
                reason: "no such simulated switch".into(),
            }
        })?;
        debug!(service = %spec.service_name, "simulated switch connected");
        Ok(Arc::new(SimSwitch {
            name: spec.display_name,
            ports: Mutex::new(ports),
            hub: self.hub.clone(),
            done: spec.done,
        }))
    }
}
