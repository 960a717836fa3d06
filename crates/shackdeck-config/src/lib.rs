//! Configuration for shackdeck.
//!
//! One TOML file (plus `SHACKDECK_*` environment overrides) holding the
//! discovery settings, the button-surface geometry, the page layouts, and
//! the devices of the built-in simulation. Translation helpers turn it into
//! the runtime types of `shackdeck-core` and `shackdeck-deck`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shackdeck_core::{DiscoveryConfig, Port, ReconnectConfig, ServicePrefixes, Terminal};
use shackdeck_deck::{ButtonLayout, PageLayout};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub deck: DeckSettings,

    /// Page shown at startup.
    #[serde(default = "default_root_page")]
    pub root_page: String,

    #[serde(default)]
    pub pages: Vec<PageLayout>,

    #[serde(default)]
    pub simulation: Simulation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery: DiscoverySettings::default(),
            deck: DeckSettings::default(),
            root_page: default_root_page(),
            pages: default_pages(),
            simulation: Simulation::default(),
        }
    }
}

fn default_root_page() -> String {
    "main".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_rotator_prefix")]
    pub rotator_prefix: String,

    #[serde(default = "default_switch_prefix")]
    pub switch_prefix: String,

    /// Seconds without a registry mention before a service counts as gone.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Registry re-subscription backoff.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            rotator_prefix: default_rotator_prefix(),
            switch_prefix: default_switch_prefix(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_rotator_prefix() -> String {
    ServicePrefixes::default().rotator
}
fn default_switch_prefix() -> String {
    ServicePrefixes::default().switch
}
fn default_ttl_secs() -> u64 {
    20
}
fn default_sweep_interval_secs() -> u64 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeckSettings {
    #[serde(default = "default_buttons")]
    pub buttons: usize,

    /// Buttons per row.
    #[serde(default = "default_columns")]
    pub columns: usize,

    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            buttons: default_buttons(),
            columns: default_columns(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

fn default_buttons() -> usize {
    15
}
fn default_columns() -> usize {
    5
}
fn default_long_press_ms() -> u64 {
    1_000
}

/// Devices served by the in-process simulated registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Simulation {
    #[serde(default)]
    pub rotators: Vec<SimulatedRotator>,

    #[serde(default)]
    pub switches: Vec<SimulatedSwitch>,

    /// How often every simulated service is re-announced. Must stay below
    /// the discovery TTL or devices will expire.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            rotators: vec![
                SimulatedRotator {
                    name: "Tower 1".into(),
                    heading: 0,
                },
                SimulatedRotator {
                    name: "Tower 2".into(),
                    heading: 90,
                },
            ],
            switches: vec![SimulatedSwitch {
                name: "Stack Match".into(),
                ports: vec![Port {
                    name: "SM".into(),
                    terminals: vec![
                        Terminal {
                            name: "OB11".into(),
                            state: true,
                        },
                        Terminal {
                            name: "4L".into(),
                            state: false,
                        },
                    ],
                }],
            }],
            refresh_secs: default_refresh_secs(),
        }
    }
}

fn default_refresh_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulatedRotator {
    pub name: String,
    #[serde(default)]
    pub heading: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulatedSwitch {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<Port>,
}

/// Layout matching the default simulation.
fn default_pages() -> Vec<PageLayout> {
    let terminal = |position: usize, name: &str| ButtonLayout::Terminal {
        position,
        device: "Stack Match".into(),
        port: "SM".into(),
        terminal: name.into(),
        text: None,
        next: Some("bands".into()),
    };
    let label = |position: usize, text: &str, next: Option<&str>| ButtonLayout::Label {
        position,
        text: text.into(),
        next: next.map(Into::into),
    };

    vec![
        PageLayout {
            id: "main".into(),
            parent: None,
            buttons: vec![
                label(0, "SHACK", None),
                ButtonLayout::Rotator {
                    position: 1,
                    device: "Tower 1".into(),
                    next: None,
                },
                ButtonLayout::Rotator {
                    position: 2,
                    device: "Tower 2".into(),
                    next: None,
                },
                terminal(5, "OB11"),
                terminal(6, "4L"),
                label(10, "BANDS", Some("bands")),
            ],
        },
        PageLayout {
            id: "bands".into(),
            parent: Some("main".into()),
            buttons: vec![
                label(0, "20m", None),
                label(1, "15m", None),
                label(2, "10m", None),
                label(4, "BACK", Some("main")),
            ],
        },
    ]
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discovery;
        if d.ttl_secs == 0 {
            return Err(invalid("discovery.ttl_secs", "must be greater than zero"));
        }
        if d.sweep_interval_secs == 0 {
            return Err(invalid(
                "discovery.sweep_interval_secs",
                "must be greater than zero",
            ));
        }
        if d.rotator_prefix.is_empty() || d.switch_prefix.is_empty() {
            return Err(invalid("discovery prefixes", "must not be empty"));
        }
        if d.rotator_prefix == d.switch_prefix {
            return Err(invalid(
                "discovery prefixes",
                format!("rotator and switch share '{}'", d.rotator_prefix),
            ));
        }
        if self.deck.buttons == 0 {
            return Err(invalid("deck.buttons", "must be greater than zero"));
        }
        if self.deck.columns == 0 {
            return Err(invalid("deck.columns", "must be greater than zero"));
        }
        if self.deck.long_press_ms == 0 {
            return Err(invalid("deck.long_press_ms", "must be greater than zero"));
        }
        if !self.pages.iter().any(|p| p.id == self.root_page) {
            return Err(invalid(
                "root_page",
                format!("no page with id '{}'", self.root_page),
            ));
        }
        Ok(())
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        let d = &self.discovery;
        DiscoveryConfig {
            prefixes: ServicePrefixes {
                rotator: d.rotator_prefix.clone(),
                switch: d.switch_prefix.clone(),
            },
            ttl: Duration::from_secs(d.ttl_secs),
            sweep_interval: Duration::from_secs(d.sweep_interval_secs),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(d.initial_delay_ms),
                max_delay: Duration::from_millis(d.max_delay_ms),
                max_retries: None,
            },
        }
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.deck.long_press_ms)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "shackdeck", "shackdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("shackdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate config from `path` + environment. A missing file
/// yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SHACKDECK_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
