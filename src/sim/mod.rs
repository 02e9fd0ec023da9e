//! # Simulator Module
//!
//! Connection to the flight simulator transport.
//!
//! This module handles:
//! - The catalog of telemetry requests registered with the simulator
//! - The `SimConnection` trait owned by the bridge service
//! - Decoding raw data blocks into typed telemetry events
//! - Replaying recorded simulator sessions

pub mod connection;
pub mod decoder;
pub mod replay;
pub mod request;

pub use connection::{Pump, SimConnection, WindowHandle};
pub use replay::ReplayConnection;
pub use request::TelemetryRequest;
