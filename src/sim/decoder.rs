//! # Simulator Message Decoder
//!
//! Decodes simulator data blocks into typed telemetry events.
//!
//! Each data block carries the request id it answers, the simulator object it
//! describes and the requested variables as `f64` values in definition order.
//!
//! | Request | Values |
//! |---------|--------|
//! | Position | latitude, longitude, altitude ft, ground speed kt, true track |
//! | Attitude | pitch, bank, true heading |
//! | Traffic (by type or per object) | latitude, longitude, altitude ft, vertical speed fpm, on ground, true heading, airspeed kt |
//!
//! Pitch and bank arrive in the simulator's convention (nose up and right
//! bank negative) and are flipped here.

use serde::{Deserialize, Serialize};

use super::request::{TelemetryRequest, USER_OBJECT_ID};
use crate::error::{BridgeError, Result};
use crate::telemetry::{Attitude, Position, TelemetryEvent, Traffic};

/// Number of values in a position block
pub const POSITION_VALUE_COUNT: usize = 5;

/// Number of values in an attitude block
pub const ATTITUDE_VALUE_COUNT: usize = 3;

/// Number of values in a traffic block
pub const TRAFFIC_VALUE_COUNT: usize = 7;

/// Raw data block as delivered by the simulator transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub request_id: u32,

    #[serde(default = "default_object_id")]
    pub object_id: u32,

    #[serde(default)]
    pub values: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
}

fn default_object_id() -> u32 {
    USER_OBJECT_ID
}

/// Decode a raw data block
///
/// # Returns
///
/// * `Ok(Some(event))` - Decoded telemetry event
/// * `Ok(None)` - Block is valid but carries nothing to forward (own-ship
///   reported through a traffic subscription)
///
/// # Errors
///
/// Returns `DecodeFailure` if the request id is unknown, the block is too
/// short or a value is not finite
pub fn decode_message(message: &RawMessage) -> Result<Option<TelemetryEvent>> {
    if let Some(object_id) = TelemetryRequest::object_id_of(message.request_id) {
        let traffic = decode_traffic(message)?;
        return Ok(Some(TelemetryEvent::Traffic { traffic, object_id }));
    }

    match TelemetryRequest::try_from(message.request_id)? {
        TelemetryRequest::Position => Ok(Some(TelemetryEvent::Position(decode_position(
            &message.values,
        )?))),
        TelemetryRequest::Attitude => Ok(Some(TelemetryEvent::Attitude(decode_attitude(
            &message.values,
        )?))),
        TelemetryRequest::TrafficAircraft | TelemetryRequest::TrafficHelicopter => {
            if message.object_id == USER_OBJECT_ID {
                return Ok(None);
            }
            let traffic = decode_traffic(message)?;
            Ok(Some(TelemetryEvent::Traffic {
                traffic,
                object_id: message.object_id,
            }))
        }
        other => Err(BridgeError::DecodeFailure(format!(
            "unexpected data block for request {:?}",
            other
        ))),
    }
}

/// Decode a position block
pub fn decode_position(values: &[f64]) -> Result<Position> {
    let v = checked_values("Position", values, POSITION_VALUE_COUNT)?;

    if !(-90.0..=90.0).contains(&v[0]) || !(-180.0..=180.0).contains(&v[1]) {
        return Err(BridgeError::DecodeFailure(format!(
            "Position out of range: lat {}, lon {}",
            v[0], v[1]
        )));
    }

    Ok(Position {
        latitude: v[0],
        longitude: v[1],
        altitude_ft: v[2],
        ground_speed_kts: v[3],
        track_deg: v[4],
    })
}

/// Decode an attitude block
pub fn decode_attitude(values: &[f64]) -> Result<Attitude> {
    let v = checked_values("Attitude", values, ATTITUDE_VALUE_COUNT)?;

    Ok(Attitude {
        pitch_deg: -v[0],
        bank_deg: -v[1],
        heading_deg: v[2],
    })
}

/// Decode a traffic block
pub fn decode_traffic(message: &RawMessage) -> Result<Traffic> {
    let v = checked_values("Traffic", &message.values, TRAFFIC_VALUE_COUNT)?;

    Ok(Traffic {
        latitude: v[0],
        longitude: v[1],
        altitude_ft: v[2],
        vertical_speed_fpm: v[3],
        on_ground: v[4] != 0.0,
        heading_deg: v[5],
        airspeed_kts: v[6],
        callsign: message.callsign.clone().unwrap_or_default(),
    })
}

fn checked_values<'a>(name: &str, values: &'a [f64], expected: usize) -> Result<&'a [f64]> {
    if values.len() < expected {
        return Err(BridgeError::DecodeFailure(format!(
            "{} block too short: expected {} values, got {}",
            name,
            expected,
            values.len()
        )));
    }

    let values = &values[..expected];
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(BridgeError::DecodeFailure(format!(
            "{} value {} is not finite",
            name, index
        )));
    }

    Ok(values)
}
