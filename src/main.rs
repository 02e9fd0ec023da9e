//! # SimMap Bridge
//!
//! Headless host for the telemetry bridge.
//!
//! Plays back a simulator recording through the bridge and broadcasts
//! ForeFlight datagrams to moving-map apps on the local network.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (`config/default.toml` or the path given as first argument)
//!    - Set up logging with tracing subscriber
//!    - Bind the UDP broadcast socket
//!    - Connect to the simulator
//!
//! 2. **Main Loop**
//!    - Deliver pending simulator messages at the configured pump interval,
//!      standing in for the native "data ready" window message
//!    - Log forwarding statistics periodically
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Disconnect from the simulator
//!    - Drain queued datagrams and log totals
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simmap_bridge::bridge::{BridgeController, DisplayState};
use simmap_bridge::broadcast::{BroadcastForwarder, UdpTransport};
use simmap_bridge::config::{Config, LoggingConfig};
use simmap_bridge::sim::ReplayConnection;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of pumps between status log messages
const LOG_INTERVAL_PUMPS: u64 = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging)?;

    info!("SimMap Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let transport = UdpTransport::bind(config.broadcast.bind(), config.broadcast.target())
        .await
        .context("Failed to bind broadcast socket")?;
    let forwarder = BroadcastForwarder::new(transport, config.broadcast.sim_name.clone());

    let connection = ReplayConnection::new(
        &config.simulator.replay_file,
        config.simulator.messages_per_pump,
        config.simulator.loop_replay,
    );
    info!("Replaying simulator recording {}", connection.path().display());
    let mut controller = BridgeController::new(connection, forwarder);

    let handle = config.simulator.window_handle();
    if !controller.can_connect(handle) {
        bail!("No window handle available");
    }
    controller.connect(handle);
    if controller.display_state() == DisplayState::Error {
        controller.shutdown().await;
        bail!("Unable to connect to simulator");
    }

    let mut pump_interval = interval(Duration::from_millis(config.simulator.pump_interval_ms));
    info!(
        "Broadcasting to {} every {}ms",
        config.broadcast.target(),
        config.simulator.pump_interval_ms
    );
    info!("Press Ctrl+C to exit");

    let mut pump_count: u64 = 0;
    let mut event_count: u64 = 0;

    loop {
        tokio::select! {
            _ = pump_interval.tick() => {
                event_count += controller.receive_message() as u64;
                pump_count += 1;

                if pump_count % LOG_INTERVAL_PUMPS == 0 {
                    let stats = controller.forwarder_stats();
                    info!(
                        "Pumped {} events ({} datagrams sent, {} failed, state {:?})",
                        event_count, stats.sent, stats.failed, controller.display_state()
                    );
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = controller.shutdown().await;
    info!("Total datagrams sent: {} ({} failed)", stats.sent, stats.failed);

    Ok(())
}

/// Load the config named on the command line, else the default file if present
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("Failed to load config from {}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Console logging plus an optional daily rolling log file
///
/// `RUST_LOG` overrides the configured level.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "simmap-bridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
