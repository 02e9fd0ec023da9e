//! # Broadcast Module
//!
//! Network sink for the moving-map client.
//!
//! This module handles:
//! - ForeFlight message encoding (GPS, attitude, traffic)
//! - UDP broadcast transmission
//! - Best-effort forwarding with failure accounting

pub mod foreflight;
pub mod forwarder;
pub mod transport;

pub use forwarder::{BroadcastForwarder, ForwarderStats};
pub use transport::{DatagramTransport, UdpTransport};
