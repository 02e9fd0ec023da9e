//! # SimMap Bridge Library
//!
//! Broadcast a flight simulator's own-ship position, attitude and nearby
//! traffic to moving-map apps on the local network.
//!
//! This library provides the telemetry bridge: the simulator connection
//! lifecycle, decoding of simulator telemetry into typed events, and
//! best-effort forwarding of those events as ForeFlight UDP datagrams.

pub mod bridge;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod sim;
pub mod telemetry;
