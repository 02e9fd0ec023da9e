//! # Telemetry Module
//!
//! Typed telemetry payloads produced by the simulator connection and consumed
//! by the broadcast forwarder.
//!
//! This module handles:
//! - Own-ship position and attitude
//! - Traffic reports paired with their simulator object id
//! - The `TelemetryEvent` sum type yielded by a pump

pub mod types;

pub use types::{Attitude, Position, TelemetryEvent, Traffic};
