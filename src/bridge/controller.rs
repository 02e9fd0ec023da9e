//! # Bridge Controller
//!
//! Wires the telemetry bridge to the broadcast forwarder and projects the
//! connection state for display.
//!
//! Each telemetry stream is consumed by its own forwarding task, so a slow
//! network never holds up the pump thread. Events of one kind are forwarded
//! in decode order; no ordering is kept across kinds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::StateChanged;
use super::service::{ConnectionState, TelemetryBridge};
use crate::broadcast::{BroadcastForwarder, DatagramTransport, ForwarderStats};
use crate::sim::{SimConnection, WindowHandle};

/// Connection state as shown to the user
///
/// Error, else connected, else disconnected. A bridge that never tried to
/// connect is shown as disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Connected,
    Disconnected,
    Error,
}

impl From<ConnectionState> for DisplayState {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Unknown | ConnectionState::Disconnected => DisplayState::Disconnected,
            ConnectionState::Connected => DisplayState::Connected,
            ConnectionState::ErrorOccurred => DisplayState::Error,
        }
    }
}

#[derive(Debug)]
struct Projection {
    connected: AtomicBool,
    error: AtomicBool,
    display: watch::Sender<DisplayState>,
}

impl Projection {
    fn apply(&self, change: &StateChanged) {
        self.connected.store(change.connected, Ordering::Release);
        self.error.store(change.error.is_some(), Ordering::Release);

        // A state change only fires after a connect attempt
        let state = ConnectionState::derive(true, change.connected, change.error);
        self.display.send_replace(DisplayState::from(state));
    }
}

/// Read-only view of the projected state, shareable across threads.
///
/// Reads are eventually consistent with the pump thread.
#[derive(Debug, Clone)]
pub struct BridgeStatus {
    projection: Arc<Projection>,
}

impl BridgeStatus {
    pub fn connected(&self) -> bool {
        self.projection.connected.load(Ordering::Acquire)
    }

    pub fn error_occurred(&self) -> bool {
        self.projection.error.load(Ordering::Acquire)
    }

    pub fn display_state(&self) -> DisplayState {
        *self.projection.display.borrow()
    }

    /// Watch display state changes
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.projection.display.subscribe()
    }
}

/// Owns the bridge service and the forwarder
pub struct BridgeController<C: SimConnection, T: DatagramTransport + 'static> {
    bridge: TelemetryBridge<C>,
    forwarder: Arc<BroadcastForwarder<T>>,
    status: BridgeStatus,
    workers: Vec<JoinHandle<u64>>,
}

impl<C: SimConnection, T: DatagramTransport + 'static> BridgeController<C, T> {
    /// Subscribe `forwarder` to a new bridge over `connection`.
    ///
    /// Spawns one forwarding task per telemetry stream, so it must be called
    /// from within a Tokio runtime.
    pub fn new(connection: C, forwarder: BroadcastForwarder<T>) -> Self {
        let mut bridge = TelemetryBridge::new(connection);
        let forwarder = Arc::new(forwarder);

        let (display, _) = watch::channel(DisplayState::Disconnected);
        let projection = Arc::new(Projection {
            connected: AtomicBool::new(false),
            error: AtomicBool::new(false),
            display,
        });
        let listener = projection.clone();
        bridge.on_state_changed(Box::new(move |change: &StateChanged| listener.apply(change)));

        let mut workers = Vec::with_capacity(3);

        let mut positions = bridge.subscribe_positions();
        let fwd = forwarder.clone();
        workers.push(tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Some(position) = positions.recv().await {
                fwd.send_position(&position).await;
                forwarded += 1;
            }
            debug!(stream = "position", forwarded, "Forwarding task stopped");
            forwarded
        }));

        let mut attitudes = bridge.subscribe_attitudes();
        let fwd = forwarder.clone();
        workers.push(tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Some(attitude) = attitudes.recv().await {
                fwd.send_attitude(&attitude).await;
                forwarded += 1;
            }
            debug!(stream = "attitude", forwarded, "Forwarding task stopped");
            forwarded
        }));

        let mut traffic = bridge.subscribe_traffic();
        let fwd = forwarder.clone();
        workers.push(tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Some((report, object_id)) = traffic.recv().await {
                fwd.send_traffic(&report, object_id).await;
                forwarded += 1;
            }
            debug!(stream = "traffic", forwarded, "Forwarding task stopped");
            forwarded
        }));

        Self {
            bridge,
            forwarder,
            status: BridgeStatus { projection },
            workers,
        }
    }

    /// Connect is allowed whenever a window handle exists
    pub fn can_connect(&self, handle: WindowHandle) -> bool {
        !handle.is_null()
    }

    pub fn connect(&mut self, handle: WindowHandle) {
        self.bridge.connect(handle);
    }

    pub fn disconnect(&mut self) {
        self.bridge.disconnect();
    }

    /// Connect if not connected, else disconnect
    pub fn toggle_connect(&mut self, handle: WindowHandle) {
        if self.bridge.connected() {
            self.disconnect();
        } else {
            self.connect(handle);
        }
    }

    /// Deliver pending simulator messages; call on every simulator notification
    pub fn receive_message(&mut self) -> usize {
        self.bridge.receive_message()
    }

    pub fn connected(&self) -> bool {
        self.status.connected()
    }

    pub fn display_state(&self) -> DisplayState {
        self.status.display_state()
    }

    /// Shareable status view
    pub fn status(&self) -> BridgeStatus {
        self.status.clone()
    }

    pub fn forwarder_stats(&self) -> ForwarderStats {
        self.forwarder.stats()
    }

    /// Disconnect, release the streams and wait for queued datagrams to drain
    pub async fn shutdown(mut self) -> ForwarderStats {
        self.bridge.disconnect();
        self.bridge.release_subscribers();

        let mut forwarded = 0u64;
        for worker in self.workers.drain(..) {
            match worker.await {
                Ok(count) => forwarded += count,
                Err(e) => warn!("Forwarding task failed: {}", e),
            }
        }

        let stats = self.forwarder.stats();
        info!(
            forwarded,
            sent = stats.sent,
            failed = stats.failed,
            "Bridge shut down"
        );
        stats
    }
}
