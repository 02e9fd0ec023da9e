//! # Broadcast Forwarder
//!
//! Best-effort sink that turns telemetry events into ForeFlight datagrams.
//!
//! Send failures are logged and counted, never returned: a dropped frame is
//! superseded by the next update.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::{trace, warn};

use super::foreflight::{encode_attitude, encode_gps, encode_traffic};
use super::transport::DatagramTransport;
use crate::error::BridgeError;
use crate::telemetry::{Attitude, Position, Traffic};

/// Number of failures between repeated warnings
const FAILURE_LOG_INTERVAL: u64 = 100;

/// Forwards telemetry to the moving-map client
#[derive(Debug)]
pub struct BroadcastForwarder<T> {
    transport: T,
    sim_name: String,
    sent: AtomicU64,
    failed: AtomicU64,
}

/// Datagram counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForwarderStats {
    pub sent: u64,
    pub failed: u64,
}

impl<T: DatagramTransport> BroadcastForwarder<T> {
    /// Create a forwarder identifying itself as `sim_name` in every message
    pub fn new(transport: T, sim_name: impl Into<String>) -> Self {
        Self {
            transport,
            sim_name: sim_name.into(),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Forward an own-ship position
    pub async fn send_position(&self, position: &Position) {
        self.send("position", encode_gps(&self.sim_name, position)).await;
    }

    /// Forward an own-ship attitude
    pub async fn send_attitude(&self, attitude: &Attitude) {
        self.send("attitude", encode_attitude(&self.sim_name, attitude)).await;
    }

    /// Forward a traffic report for simulator object `object_id`
    pub async fn send_traffic(&self, traffic: &Traffic, object_id: u32) {
        self.send("traffic", encode_traffic(&self.sim_name, traffic, object_id))
            .await;
    }

    /// Counters since creation
    pub fn stats(&self) -> ForwarderStats {
        ForwarderStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    async fn send(&self, kind: &'static str, datagram: Bytes) {
        match self.transport.send(&datagram).await {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                trace!(kind, len = datagram.len(), "Forwarded datagram");
            }
            Err(e) => {
                let failed = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
                if failed == 1 || failed % FAILURE_LOG_INTERVAL == 0 {
                    let err = BridgeError::Forward(e);
                    warn!(kind, failed, "{}", err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::transport::mocks::MockTransport;
    use std::io;

    #[tokio::test]
    async fn test_forward_each_kind() {
        let transport = MockTransport::new();
        let forwarder = BroadcastForwarder::new(transport.clone(), "Test");

        forwarder.send_position(&Position::default()).await;
        forwarder.send_attitude(&Attitude::default()).await;
        forwarder.send_traffic(&Traffic::default(), 42).await;

        let sent = transport.get_sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].starts_with("XGPSTest,"));
        assert!(sent[1].starts_with("XATTTest,"));
        assert!(sent[2].starts_with("XTRAFFICTest,42,"));
        assert_eq!(forwarder.stats(), ForwarderStats { sent: 3, failed: 0 });
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let transport = MockTransport::new();
        transport.set_send_error(Some(io::ErrorKind::ConnectionRefused));
        let forwarder = BroadcastForwarder::new(transport.clone(), "Test");

        forwarder.send_position(&Position::default()).await;
        forwarder.send_position(&Position::default()).await;

        assert!(transport.get_sent().is_empty());
        assert_eq!(forwarder.stats(), ForwarderStats { sent: 0, failed: 2 });
    }

    #[tokio::test]
    async fn test_recovers_after_network_returns() {
        let transport = MockTransport::new();
        let forwarder = BroadcastForwarder::new(transport.clone(), "Test");

        transport.set_send_error(Some(io::ErrorKind::ConnectionRefused));
        forwarder.send_attitude(&Attitude::default()).await;
        transport.set_send_error(None);
        forwarder.send_attitude(&Attitude::default()).await;

        assert_eq!(transport.get_sent().len(), 1);
        assert_eq!(forwarder.stats(), ForwarderStats { sent: 1, failed: 1 });
    }
}
