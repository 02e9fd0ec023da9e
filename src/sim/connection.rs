//! Trait abstraction for the simulator transport to enable testing

use std::fmt;

use crate::error::{BridgeError, Result};
use crate::telemetry::TelemetryEvent;

/// Opaque handle of the host surface that receives simulator notifications.
///
/// Zero is the null handle and is never accepted by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(u64);

impl WindowHandle {
    /// The null handle
    pub const NULL: WindowHandle = WindowHandle(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Result of draining the currently queued simulator messages
#[derive(Debug, Default)]
pub struct Pump {
    /// Events decoded before the pump finished or failed, in decode order
    pub events: Vec<TelemetryEvent>,

    /// Failure that stopped the pump, if any
    pub failure: Option<BridgeError>,
}

impl Pump {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<TelemetryEvent>) -> Self {
        Self { events, failure: None }
    }

    pub fn failed(events: Vec<TelemetryEvent>, failure: BridgeError) -> Self {
        Self {
            events,
            failure: Some(failure),
        }
    }
}

/// Connection to the simulator transport
///
/// Owned and driven exclusively by the telemetry bridge service.
#[cfg_attr(test, mockall::automock)]
pub trait SimConnection: Send {
    /// Open the connection against `handle` and register telemetry subscriptions
    fn open(&mut self, handle: WindowHandle) -> Result<()>;

    /// Release the connection. Calling it when not open is a no-op.
    fn close(&mut self);

    /// Decode the messages currently queued by the transport without blocking
    fn pump_once(&mut self) -> Pump;
}
