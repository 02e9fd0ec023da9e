//! # Telemetry Types
//!
//! Domain payloads decoded from simulator data blocks.

/// Own-ship position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Latitude in degrees (positive north)
    pub latitude: f64,

    /// Longitude in degrees (positive east)
    pub longitude: f64,

    /// Altitude above mean sea level in feet
    pub altitude_ft: f64,

    /// Ground speed in knots
    pub ground_speed_kts: f64,

    /// True track over ground in degrees
    pub track_deg: f64,
}

/// Own-ship attitude
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    /// Pitch in degrees, nose up positive
    pub pitch_deg: f64,

    /// Bank in degrees, right wing down positive
    pub bank_deg: f64,

    /// True heading in degrees
    pub heading_deg: f64,
}

/// State of one nearby aircraft
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traffic {
    pub latitude: f64,
    pub longitude: f64,

    /// Altitude above mean sea level in feet
    pub altitude_ft: f64,

    /// Vertical speed in feet per minute
    pub vertical_speed_fpm: f64,

    pub on_ground: bool,

    /// True heading in degrees
    pub heading_deg: f64,

    /// Airspeed in knots
    pub airspeed_kts: f64,

    /// ATC callsign or tail number, may be empty
    pub callsign: String,
}

/// One decoded telemetry event
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Position(Position),
    Attitude(Attitude),
    /// Traffic report with the simulator object id it belongs to
    Traffic { traffic: Traffic, object_id: u32 },
}

impl TelemetryEvent {
    /// Short stream name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryEvent::Position(_) => "position",
            TelemetryEvent::Attitude(_) => "attitude",
            TelemetryEvent::Traffic { .. } => "traffic",
        }
    }
}
