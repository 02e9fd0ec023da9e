//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;

use crate::broadcast::foreflight::FOREFLIGHT_PORT;
use crate::error::{BridgeError, Result};
use crate::sim::WindowHandle;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulator connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_replay_file")]
    pub replay_file: String,

    #[serde(default = "default_window_handle")]
    pub window_handle: u64,

    #[serde(default = "default_pump_interval_ms")]
    pub pump_interval_ms: u64,

    #[serde(default = "default_messages_per_pump")]
    pub messages_per_pump: usize,

    #[serde(default)]
    pub loop_replay: bool,
}

/// Network broadcast configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BroadcastConfig {
    #[serde(default = "default_target_address")]
    pub target_address: Ipv4Addr,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: Ipv4Addr,

    #[serde(default = "default_sim_name")]
    pub sim_name: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files, console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_replay_file() -> String { "recordings/session.jsonl".to_string() }
fn default_window_handle() -> u64 { 1 }
fn default_pump_interval_ms() -> u64 { 200 }
fn default_messages_per_pump() -> usize { 16 }

fn default_target_address() -> Ipv4Addr { Ipv4Addr::BROADCAST }
fn default_port() -> u16 { FOREFLIGHT_PORT }
fn default_bind_address() -> Ipv4Addr { Ipv4Addr::UNSPECIFIED }
fn default_sim_name() -> String { "SimMapBridge".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            replay_file: default_replay_file(),
            window_handle: default_window_handle(),
            pump_interval_ms: default_pump_interval_ms(),
            messages_per_pump: default_messages_per_pump(),
            loop_replay: false,
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            target_address: default_target_address(),
            port: default_port(),
            bind_address: default_bind_address(),
            sim_name: default_sim_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl SimulatorConfig {
    pub fn window_handle(&self) -> WindowHandle {
        WindowHandle::new(self.window_handle)
    }
}

impl BroadcastConfig {
    /// Datagram destination
    pub fn target(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.target_address, self.port))
    }

    /// Local socket address, ephemeral port
    pub fn bind(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.bind_address, 0))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use simmap_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.simulator.replay_file.is_empty() {
            return Err(invalid("replay_file cannot be empty"));
        }

        if self.simulator.window_handle().is_null() {
            return Err(invalid("window_handle must be non-zero"));
        }

        if self.simulator.pump_interval_ms == 0 || self.simulator.pump_interval_ms > 10000 {
            return Err(invalid("pump_interval_ms must be between 1 and 10000"));
        }

        if self.simulator.messages_per_pump == 0 {
            return Err(invalid("messages_per_pump must be greater than 0"));
        }

        if self.broadcast.port == 0 {
            return Err(invalid("broadcast port must be non-zero"));
        }

        // The sim name is embedded in comma separated messages
        if self.broadcast.sim_name.is_empty()
            || !self.broadcast.sim_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("sim_name must be non-empty and contain only letters, digits, '-' or '_'"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        if matches!(self.logging.log_dir.as_deref(), Some("")) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}
