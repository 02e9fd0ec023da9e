//! # Bridge Module
//!
//! Connection state machine and event routing between the simulator and the
//! broadcast forwarder.
//!
//! This module handles:
//! - Connect / disconnect lifecycle with a persistent error indicator
//! - Raising position, attitude and traffic events without blocking the pump
//! - Forwarding every event stream to the network sink
//! - Projecting the connection state for display

pub mod controller;
pub mod events;
pub mod service;

pub use controller::{BridgeController, BridgeStatus, DisplayState};
pub use events::StateChanged;
pub use service::{ConnectionState, TelemetryBridge};
