//! # ForeFlight Protocol Encoder
//!
//! Encodes telemetry into the ForeFlight simulator UDP protocol understood by
//! moving-map apps. Every message is a single ASCII line sent as one datagram.
//!
//! | Message | Format |
//! |---------|--------|
//! | GPS | `XGPS<sim>,<lon>,<lat>,<alt msl m>,<track true>,<ground speed m/s>` |
//! | Attitude | `XATT<sim>,<heading true>,<pitch>,<roll>` |
//! | Traffic | `XTRAFFIC<sim>,<icao>,<lat>,<lon>,<alt ft>,<vs fpm>,<airborne>,<heading>,<speed kt>,<callsign>` |
//!
//! The traffic `<icao>` field is the simulator object id truncated to 24 bits
//! (see [`icao_address`]).

use bytes::Bytes;

use crate::telemetry::{Attitude, Position, Traffic};

/// UDP port moving-map apps listen on
pub const FOREFLIGHT_PORT: u16 = 49002;

/// Maximum callsign length carried in a traffic report
pub const MAX_CALLSIGN_LEN: usize = 8;

/// Mask for a 24-bit ICAO address
const ICAO_ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Conversion factor: feet to meters.
const FEET_TO_METERS: f64 = 0.3048;

/// Conversion factor: knots to meters per second.
const KNOTS_TO_MS: f64 = 0.514_444;

/// Encode an own-ship GPS message
///
/// # Examples
///
/// ```
/// use simmap_bridge::broadcast::foreflight::encode_gps;
/// use simmap_bridge::telemetry::Position;
///
/// let pos = Position { latitude: 47.45, longitude: -122.31, altitude_ft: 1000.0, ..Default::default() };
/// let msg = encode_gps("MSFS", &pos);
/// assert!(msg.starts_with(b"XGPSMSFS,-122.310000,47.450000,304.8,"));
/// ```
pub fn encode_gps(sim_name: &str, position: &Position) -> Bytes {
    Bytes::from(format!(
        "XGPS{},{:.6},{:.6},{:.1},{:.2},{:.1}",
        sim_name,
        position.longitude,
        position.latitude,
        position.altitude_ft * FEET_TO_METERS,
        normalize_heading(position.track_deg),
        position.ground_speed_kts * KNOTS_TO_MS,
    ))
}

/// Encode an own-ship attitude message
pub fn encode_attitude(sim_name: &str, attitude: &Attitude) -> Bytes {
    Bytes::from(format!(
        "XATT{},{:.1},{:.1},{:.1}",
        sim_name,
        normalize_heading(attitude.heading_deg),
        attitude.pitch_deg,
        attitude.bank_deg,
    ))
}

/// Encode a traffic report for simulator object `object_id`
///
/// The object id doubles as the ICAO address so the app keeps one track per
/// simulator object across updates.
pub fn encode_traffic(sim_name: &str, traffic: &Traffic, object_id: u32) -> Bytes {
    let callsign = sanitize_callsign(&traffic.callsign, object_id);
    Bytes::from(format!(
        "XTRAFFIC{},{},{:.6},{:.6},{:.0},{:.0},{},{:.0},{:.0},{}",
        sim_name,
        icao_address(object_id),
        traffic.latitude,
        traffic.longitude,
        traffic.altitude_ft,
        traffic.vertical_speed_fpm,
        if traffic.on_ground { 0 } else { 1 },
        normalize_heading(traffic.heading_deg),
        traffic.airspeed_kts,
        callsign,
    ))
}

/// ICAO address for a simulator object
///
/// Keeps the low 24 bits of the object id, so ids that differ only above
/// bit 23 share an address and the map app merges their tracks. Simulator
/// object ids are small sequential values and stay below 2^24 in practice.
pub fn icao_address(object_id: u32) -> u32 {
    object_id & ICAO_ADDRESS_MASK
}

/// Strip characters that would break the comma separated format.
///
/// Falls back to the object id when nothing printable is left.
pub fn sanitize_callsign(callsign: &str, object_id: u32) -> String {
    let cleaned: String = callsign
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_CALLSIGN_LEN)
        .collect();

    if cleaned.is_empty() {
        object_id.to_string()
    } else {
        cleaned
    }
}

/// Normalize a heading to [0, 360) degrees.
fn normalize_heading(heading: f64) -> f64 {
    let h = heading % 360.0;
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}
