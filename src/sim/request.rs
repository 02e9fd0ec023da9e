//! # Telemetry Request Catalog
//!
//! Request identifiers registered with the simulator transport. Every data
//! block the simulator sends back carries one of these ids, or a per-object
//! traffic id derived from [`TRAFFIC_OBJECT_BASE`].

use crate::error::{BridgeError, Result};

/// Offset for per-object traffic request ids
pub const TRAFFIC_OBJECT_BASE: u32 = 0x0100_0000;

/// Simulator object id of the user aircraft
pub const USER_OBJECT_ID: u32 = 1;

/// Telemetry subscriptions the bridge can register
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryRequest {
    Undefined = 0,
    Position = 1,
    Attitude = 2,
    TrafficAircraft = 3,
    TrafficHelicopter = 4,
    TrafficObjectBase = TRAFFIC_OBJECT_BASE,
}

impl TelemetryRequest {
    /// Requests registered when a connection opens, in registration order
    pub const SUBSCRIPTIONS: [TelemetryRequest; 4] = [
        TelemetryRequest::Position,
        TelemetryRequest::Attitude,
        TelemetryRequest::TrafficAircraft,
        TelemetryRequest::TrafficHelicopter,
    ];

    /// Numeric request id
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Whether this request may be registered with the simulator.
    ///
    /// `Undefined` is a placeholder and `TrafficObjectBase` is only an offset.
    pub fn is_registrable(self) -> bool {
        !matches!(
            self,
            TelemetryRequest::Undefined | TelemetryRequest::TrafficObjectBase
        )
    }

    /// Whether this is a by-type traffic subscription
    pub fn is_traffic(self) -> bool {
        matches!(
            self,
            TelemetryRequest::TrafficAircraft | TelemetryRequest::TrafficHelicopter
        )
    }

    /// Request id for a single traffic object
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the object id would overflow the id space
    pub fn traffic_object(object_id: u32) -> Result<u32> {
        TRAFFIC_OBJECT_BASE.checked_add(object_id).ok_or_else(|| {
            BridgeError::DecodeFailure(format!("traffic object id {} out of range", object_id))
        })
    }

    /// Object id encoded in a per-object traffic request id
    ///
    /// Returns `None` for ids below the traffic offset.
    pub fn object_id_of(request_id: u32) -> Option<u32> {
        request_id.checked_sub(TRAFFIC_OBJECT_BASE)
    }
}

impl TryFrom<u32> for TelemetryRequest {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(TelemetryRequest::Undefined),
            1 => Ok(TelemetryRequest::Position),
            2 => Ok(TelemetryRequest::Attitude),
            3 => Ok(TelemetryRequest::TrafficAircraft),
            4 => Ok(TelemetryRequest::TrafficHelicopter),
            TRAFFIC_OBJECT_BASE => Ok(TelemetryRequest::TrafficObjectBase),
            other => Err(BridgeError::DecodeFailure(format!(
                "unknown request id 0x{:08X}",
                other
            ))),
        }
    }
}
