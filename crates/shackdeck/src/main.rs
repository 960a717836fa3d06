//! `shackdeck`: button-surface controller for shackbus rotators and switches.
//!
//! The terminal stands in for the physical button deck: keys press buttons,
//! the grid shows what the active page drew. Devices come from a simulated
//! registry described in the config file, discovered and tracked by the
//! same watcher a networked registry would use.
//!
//! Logs go to a file (default `/tmp/shackdeck.log`) so they never corrupt
//! the terminal UI.

mod app;
mod event;
mod keymap;
mod sim;
mod surface;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use shackdeck_config::{Config, config_path, load_config_from, save_config};
use shackdeck_core::{DeviceHub, DiscoveryWatcher};
use shackdeck_deck::{GraphOptions, PageController, PageGraph};

use crate::app::App;
use crate::sim::{SimFactory, SimRegistry};
use crate::surface::TerminalSurface;

/// Drive shackbus rotators and relay switches from a button deck.
#[derive(Parser, Debug)]
#[command(name = "shackdeck", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "SHACKDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Write the default config to the config path and exit
    #[arg(long)]
    init_config: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/shackdeck.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Hold the returned guard until exit so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shackdeck={log_level},shackdeck_core={log_level},shackdeck_deck={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("shackdeck.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_path);

    if cli.init_config {
        save_config(&Config::default(), &path)
            .wrap_err_with(|| format!("writing {}", path.display()))?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config =
        load_config_from(&path).wrap_err_with(|| format!("loading {}", path.display()))?;
    info!(config = %path.display(), pages = config.pages.len(), "starting shackdeck");

    // ── Devices ──
    let discovery = config.discovery_config();
    let hub = Arc::new(DeviceHub::new());
    let registry = Arc::new(SimRegistry::new(&config.simulation, &discovery.prefixes));
    let factory = Arc::new(SimFactory::new(&hub, &config.simulation));
    info!(services = registry.services().len(), "simulated registry ready");

    let watcher = DiscoveryWatcher::new(hub.clone(), registry, factory, discovery);
    match watcher.enumerate().await {
        Ok(count) => info!(count, "initial enumeration done"),
        Err(e) => warn!(error = %e, "initial enumeration failed"),
    }
    let cancel = CancellationToken::new();
    let watcher_task = watcher.spawn(cancel.clone());

    // ── Pages ──
    let surface = Arc::new(TerminalSurface::new(config.deck.buttons));
    let options = GraphOptions::new(hub.clone(), surface.clone()).long_press(config.long_press());
    let graph = PageGraph::build(&config.pages, &config.root_page, options).await?;
    let controller = Arc::new(PageController::new(graph, surface.clone()));

    let mut app = App::new(
        controller,
        surface,
        hub,
        config.long_press(),
        config.deck.columns,
    );
    let result = app.run().await;

    cancel.cancel();
    if let Err(e) = watcher_task.await {
        warn!(error = %e, "discovery watcher task failed");
    }
    info!("shackdeck stopped");
    result
}
