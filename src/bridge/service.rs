//! # Telemetry Bridge Service
//!
//! Connection lifecycle state machine and telemetry fan-out.
//!
//! The service owns the [`SimConnection`] and is driven from the host's
//! message pump thread. The open/closed flag and the persistent error are two
//! independent axes: an error raised while connected stays set until the next
//! successful connect, and "never tried" stays distinguishable from "tried and
//! failed".
//!
//! ```text
//!  Unknown ──connect ok──▶ Connected ◀──connect ok── Disconnected
//!     │                        │  ▲                      ▲
//!     └──connect failed──▶ Disconnected + error          │
//!                              └──disconnect─────────────┘
//! ```

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use super::events::{EventStream, StateChanged, StateListener, StateListeners};
use crate::error::FailureKind;
use crate::sim::{SimConnection, WindowHandle};
use crate::telemetry::{Attitude, Position, TelemetryEvent, Traffic};

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connect attempt has been made
    Unknown,
    Connected,
    Disconnected,
    ErrorOccurred,
}

impl ConnectionState {
    /// Derive the single displayed state: error, else connected, else disconnected
    pub fn derive(attempted: bool, connected: bool, error: Option<FailureKind>) -> Self {
        if error.is_some() {
            ConnectionState::ErrorOccurred
        } else if connected {
            ConnectionState::Connected
        } else if attempted {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Unknown
        }
    }
}

/// Telemetry bridge over a simulator connection
pub struct TelemetryBridge<C: SimConnection> {
    connection: C,
    connected: bool,
    attempted: bool,
    last_error: Option<FailureKind>,
    state_listeners: StateListeners,
    positions: EventStream<Position>,
    attitudes: EventStream<Attitude>,
    traffic: EventStream<(Traffic, u32)>,
}

impl<C: SimConnection> TelemetryBridge<C> {
    /// Create a bridge that has not yet attempted to connect
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            connected: false,
            attempted: false,
            last_error: None,
            state_listeners: StateListeners::default(),
            positions: EventStream::default(),
            attitudes: EventStream::default(),
            traffic: EventStream::default(),
        }
    }

    /// Register a listener called synchronously on every state change
    pub fn on_state_changed(&mut self, listener: StateListener) {
        self.state_listeners.add(listener);
    }

    /// Subscribe to own-ship positions
    pub fn subscribe_positions(&mut self) -> mpsc::UnboundedReceiver<Position> {
        self.positions.subscribe()
    }

    /// Subscribe to own-ship attitudes
    pub fn subscribe_attitudes(&mut self) -> mpsc::UnboundedReceiver<Attitude> {
        self.attitudes.subscribe()
    }

    /// Subscribe to traffic reports paired with their object id
    pub fn subscribe_traffic(&mut self) -> mpsc::UnboundedReceiver<(Traffic, u32)> {
        self.traffic.subscribe()
    }

    /// Drop every subscriber and listener
    pub fn release_subscribers(&mut self) {
        self.positions.clear();
        self.attitudes.clear();
        self.traffic.clear();
        self.state_listeners.clear();
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<FailureKind> {
        self.last_error
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::derive(self.attempted, self.connected, self.last_error)
    }

    /// Open the simulator connection
    ///
    /// No-op when already connected or when `handle` is null. Failures set
    /// the persistent error and are reported through `StateChanged`.
    pub fn connect(&mut self, handle: WindowHandle) {
        if self.connected {
            debug!("Connect ignored: already connected");
            return;
        }
        if handle.is_null() {
            debug!("Connect ignored: null window handle");
            return;
        }

        self.attempted = true;
        match self.connection.open(handle) {
            Ok(()) => {
                self.connected = true;
                self.last_error = None;
                info!("Connected to simulator (window {})", handle);
                self.notify(false);
            }
            Err(e) => {
                self.last_error = Some(e.failure_kind());
                error!("Unable to connect to simulator: {}", e);
                self.notify(true);
            }
        }
    }

    /// Close the simulator connection. No-op when not connected.
    pub fn disconnect(&mut self) {
        if !self.connected {
            debug!("Disconnect ignored: not connected");
            return;
        }

        self.connection.close();
        self.connected = false;
        info!("Disconnected from simulator");
        self.notify(false);
    }

    /// Deliver the messages queued since the last simulator notification
    ///
    /// Raises one event per decoded message and returns how many were raised.
    /// A decode failure sets the persistent error but leaves the connection
    /// open; closing stays an explicit caller action.
    pub fn receive_message(&mut self) -> usize {
        if !self.connected {
            trace!("Message ignored: not connected");
            return 0;
        }

        let pump = self.connection.pump_once();
        let raised = pump.events.len();

        for event in pump.events {
            let kind = event.kind();
            let delivered = match event {
                TelemetryEvent::Position(position) => self.positions.emit(position),
                TelemetryEvent::Attitude(attitude) => self.attitudes.emit(attitude),
                TelemetryEvent::Traffic { traffic, object_id } => {
                    self.traffic.emit((traffic, object_id))
                }
            };
            trace!(kind, delivered, "Raised telemetry event");
        }

        if let Some(e) = pump.failure {
            self.last_error = Some(e.failure_kind());
            error!("Simulator message pump failed after {} events: {}", raised, e);
            self.notify(true);
        }

        raised
    }

    fn notify(&self, failure: bool) {
        self.state_listeners.notify(&StateChanged {
            failure,
            connected: self.connected,
            error: self.last_error,
        });
    }
}

impl<C: SimConnection> Drop for TelemetryBridge<C> {
    fn drop(&mut self) {
        if self.connected {
            self.connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::sim::connection::{MockSimConnection, Pump};
    use mockall::Sequence;
    use std::sync::{Arc, Mutex};

    const HANDLE: WindowHandle = WindowHandle::new(0x1000);

    fn position(lat: f64) -> TelemetryEvent {
        TelemetryEvent::Position(Position {
            latitude: lat,
            ..Default::default()
        })
    }

    fn attitude(heading: f64) -> TelemetryEvent {
        TelemetryEvent::Attitude(Attitude {
            heading_deg: heading,
            ..Default::default()
        })
    }

    fn traffic(object_id: u32) -> TelemetryEvent {
        TelemetryEvent::Traffic {
            traffic: Traffic::default(),
            object_id,
        }
    }

    fn recorded(bridge: &mut TelemetryBridge<MockSimConnection>) -> Arc<Mutex<Vec<StateChanged>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        bridge.on_state_changed(Box::new(move |change: &StateChanged| {
            sink.lock().unwrap().push(*change)
        }));
        changes
    }

    fn connected_mock() -> MockSimConnection {
        let mut conn = MockSimConnection::new();
        conn.expect_open().times(1).returning(|_| Ok(()));
        conn
    }

    #[test]
    fn test_initial_state_is_unknown() {
        let bridge = TelemetryBridge::new(MockSimConnection::new());
        assert_eq!(bridge.state(), ConnectionState::Unknown);
        assert!(!bridge.connected());
        assert!(bridge.last_error().is_none());
    }

    #[test]
    fn test_connect_with_null_handle_is_noop() {
        let mut conn = MockSimConnection::new();
        conn.expect_open().never();
        conn.expect_close().never();
        conn.expect_pump_once().never();

        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(WindowHandle::NULL);

        assert_eq!(bridge.state(), ConnectionState::Unknown);
        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connect_with_null_handle_after_disconnect_keeps_state() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        let mut bridge = TelemetryBridge::new(conn);

        bridge.connect(HANDLE);
        bridge.disconnect();
        bridge.connect(WindowHandle::NULL);

        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_with_null_handle_while_connected_keeps_state() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);
        bridge.connect(WindowHandle::NULL);

        assert_eq!(bridge.state(), ConnectionState::Connected);
        assert!(bridge.connected());
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_connect_with_null_handle_after_failure_keeps_error() {
        let mut conn = MockSimConnection::new();
        conn.expect_open()
            .times(1)
            .returning(|_| Err(BridgeError::TransportUnavailable("simulator not running".into())));
        conn.expect_close().never();
        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);
        bridge.connect(WindowHandle::NULL);

        assert_eq!(bridge.state(), ConnectionState::ErrorOccurred);
        assert_eq!(bridge.last_error(), Some(FailureKind::TransportUnavailable));
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_connect_success_emits_state_changed() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);

        assert_eq!(bridge.state(), ConnectionState::Connected);
        assert_eq!(
            *changes.lock().unwrap(),
            vec![StateChanged {
                failure: false,
                connected: true,
                error: None
            }]
        );
    }

    #[test]
    fn test_connect_when_connected_is_noop() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);
        bridge.connect(HANDLE);

        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_connect_failure_sets_error() {
        let mut conn = MockSimConnection::new();
        conn.expect_open()
            .times(1)
            .returning(|_| Err(BridgeError::TransportUnavailable("simulator not running".into())));
        conn.expect_close().never();

        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);

        assert_eq!(bridge.state(), ConnectionState::ErrorOccurred);
        assert!(!bridge.connected());
        assert_eq!(bridge.last_error(), Some(FailureKind::TransportUnavailable));
        assert_eq!(
            *changes.lock().unwrap(),
            vec![StateChanged {
                failure: true,
                connected: false,
                error: Some(FailureKind::TransportUnavailable)
            }]
        );
    }

    #[test]
    fn test_successful_connect_clears_error() {
        let mut seq = Sequence::new();
        let mut conn = MockSimConnection::new();
        conn.expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::TransportUnavailable("version mismatch".into())));
        conn.expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        conn.expect_close().times(1).return_const(());

        let mut bridge = TelemetryBridge::new(conn);
        bridge.connect(HANDLE);
        assert_eq!(bridge.state(), ConnectionState::ErrorOccurred);

        bridge.connect(HANDLE);
        assert_eq!(bridge.state(), ConnectionState::Connected);
        assert!(bridge.last_error().is_none());
    }

    #[test]
    fn test_disconnect_when_not_connected_is_silent() {
        let mut conn = MockSimConnection::new();
        conn.expect_close().never();

        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.disconnect();

        assert!(changes.lock().unwrap().is_empty());
        assert_eq!(bridge.state(), ConnectionState::Unknown);
    }

    #[test]
    fn test_disconnect_closes_once() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());

        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);

        bridge.connect(HANDLE);
        bridge.disconnect();
        bridge.disconnect();

        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[1],
            StateChanged {
                failure: false,
                connected: false,
                error: None
            }
        );
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_receive_message_when_disconnected_does_not_pump() {
        let mut conn = MockSimConnection::new();
        conn.expect_pump_once().never();

        let mut bridge = TelemetryBridge::new(conn);
        assert_eq!(bridge.receive_message(), 0);
    }

    #[test]
    fn test_receive_message_routes_events_in_order() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        conn.expect_pump_once().times(1).returning(|| {
            Pump::with_events(vec![
                position(1.0),
                attitude(10.0),
                traffic(42),
                position(2.0),
                attitude(20.0),
                traffic(7),
                position(3.0),
            ])
        });

        let mut bridge = TelemetryBridge::new(conn);
        let mut positions = bridge.subscribe_positions();
        let mut attitudes = bridge.subscribe_attitudes();
        let mut traffic_rx = bridge.subscribe_traffic();

        bridge.connect(HANDLE);
        assert_eq!(bridge.receive_message(), 7);

        let lats: Vec<f64> = std::iter::from_fn(|| positions.try_recv().ok())
            .map(|p| p.latitude)
            .collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);

        let headings: Vec<f64> = std::iter::from_fn(|| attitudes.try_recv().ok())
            .map(|a| a.heading_deg)
            .collect();
        assert_eq!(headings, vec![10.0, 20.0]);

        let ids: Vec<u32> = std::iter::from_fn(|| traffic_rx.try_recv().ok())
            .map(|(_, id)| id)
            .collect();
        assert_eq!(ids, vec![42, 7]);
    }

    #[test]
    fn test_decode_failure_sets_error_and_keeps_earlier_events() {
        let mut seq = Sequence::new();
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        conn.expect_pump_once()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Pump::failed(
                    vec![position(1.0), attitude(90.0)],
                    BridgeError::DecodeFailure("unexpected message".into()),
                )
            });
        conn.expect_pump_once()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Pump::with_events(vec![position(2.0)]));

        let mut bridge = TelemetryBridge::new(conn);
        let changes = recorded(&mut bridge);
        let mut positions = bridge.subscribe_positions();
        let mut attitudes = bridge.subscribe_attitudes();

        bridge.connect(HANDLE);
        assert_eq!(bridge.receive_message(), 2);

        assert_eq!(bridge.state(), ConnectionState::ErrorOccurred);
        assert!(bridge.connected(), "decode failure must not close the connection");
        assert_eq!(positions.try_recv().unwrap().latitude, 1.0);
        assert_eq!(attitudes.try_recv().unwrap().heading_deg, 90.0);
        assert_eq!(
            changes.lock().unwrap().last().copied(),
            Some(StateChanged {
                failure: true,
                connected: true,
                error: Some(FailureKind::DecodeFailure)
            })
        );

        // The connection recovered
        assert_eq!(bridge.receive_message(), 1);
        assert_eq!(positions.try_recv().unwrap().latitude, 2.0);
        assert_eq!(bridge.last_error(), Some(FailureKind::DecodeFailure));
    }

    #[test]
    fn test_same_traffic_object_keeps_id() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());
        conn.expect_pump_once()
            .times(2)
            .returning(|| Pump::with_events(vec![traffic(42)]));

        let mut bridge = TelemetryBridge::new(conn);
        let mut traffic_rx = bridge.subscribe_traffic();

        bridge.connect(HANDLE);
        bridge.receive_message();
        bridge.receive_message();

        assert_eq!(traffic_rx.try_recv().unwrap().1, 42);
        assert_eq!(traffic_rx.try_recv().unwrap().1, 42);
    }

    #[test]
    fn test_drop_closes_open_connection() {
        let mut conn = connected_mock();
        conn.expect_close().times(1).return_const(());

        let mut bridge = TelemetryBridge::new(conn);
        bridge.connect(HANDLE);
        drop(bridge);
    }

    #[test]
    fn test_release_subscribers_closes_streams() {
        let mut bridge = TelemetryBridge::new(MockSimConnection::new());
        let mut positions = bridge.subscribe_positions();
        bridge.release_subscribers();
        assert!(matches!(
            positions.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_derive_state_error_takes_precedence() {
        for attempted in [false, true] {
            for connected in [false, true] {
                assert_eq!(
                    ConnectionState::derive(attempted, connected, Some(FailureKind::DecodeFailure)),
                    ConnectionState::ErrorOccurred
                );
            }
        }
        assert_eq!(ConnectionState::derive(true, true, None), ConnectionState::Connected);
        assert_eq!(ConnectionState::derive(true, false, None), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::derive(false, false, None), ConnectionState::Unknown);
    }
}
