//! # Replay Connection
//!
//! A [`SimConnection`] that plays back a recording of raw simulator data
//! blocks stored as JSON Lines, one [`RawMessage`] per line:
//!
//! ```text
//! {"request_id":1,"values":[47.45,-122.31,1200.0,95.0,180.0]}
//! {"request_id":2,"values":[-2.5,0.0,180.0]}
//! {"request_id":3,"object_id":42,"values":[47.5,-122.3,3500.0,0.0,0.0,270.0,140.0],"callsign":"N172SP"}
//! ```
//!
//! Each pump drains at most `messages_per_pump` lines, standing in for the
//! messages the native transport has queued since the last notification.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use super::connection::{Pump, SimConnection, WindowHandle};
use super::decoder::{decode_message, RawMessage};
use super::request::{TelemetryRequest, USER_OBJECT_ID};
use crate::error::{BridgeError, Result};
use crate::telemetry::TelemetryEvent;

/// Simulator connection backed by a JSONL recording
#[derive(Debug)]
pub struct ReplayConnection {
    /// Recording file
    path: PathBuf,
    /// Maximum lines decoded per pump
    messages_per_pump: usize,
    /// Restart from the first line at the end of the recording
    loop_replay: bool,
    /// Window handle while open
    handle: Option<WindowHandle>,
    /// Recording lines loaded at open
    lines: Vec<String>,
    /// Next line to deliver
    cursor: usize,
    /// Request ids currently registered with the transport
    subscriptions: HashSet<u32>,
}

impl ReplayConnection {
    /// Create a closed replay connection for the recording at `path`
    pub fn new<P: AsRef<Path>>(path: P, messages_per_pump: usize, loop_replay: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            messages_per_pump: messages_per_pump.max(1),
            loop_replay,
            handle: None,
            lines: Vec::new(),
            cursor: 0,
            subscriptions: HashSet::new(),
        }
    }

    /// Recording file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `request_id` is registered
    pub fn is_subscribed(&self, request_id: u32) -> bool {
        self.subscriptions.contains(&request_id)
    }

    fn register(&mut self, request_id: u32) {
        if self.subscriptions.insert(request_id) {
            debug!("Registered telemetry request 0x{:08X}", request_id);
        }
    }

    fn next_line(&mut self) -> Option<String> {
        if self.cursor >= self.lines.len() {
            if !self.loop_replay || self.lines.is_empty() {
                return None;
            }
            trace!("Recording finished, restarting replay");
            self.cursor = 0;
        }

        let line = self.lines[self.cursor].clone();
        self.cursor += 1;
        Some(line)
    }

    fn process_line(&mut self, line: &str) -> Result<Option<TelemetryEvent>> {
        let message: RawMessage = serde_json::from_str(line).map_err(|e| {
            BridgeError::DecodeFailure(format!("malformed message at line {}: {}", self.cursor, e))
        })?;

        if !self.is_subscribed(message.request_id) {
            trace!("Ignoring data for unregistered request 0x{:08X}", message.request_id);
            return Ok(None);
        }

        let event = decode_message(&message)?;

        // Traffic seen through a by-type subscription gets its own request
        let by_type_traffic = TelemetryRequest::try_from(message.request_id)
            .map(TelemetryRequest::is_traffic)
            .unwrap_or(false);
        if by_type_traffic && message.object_id != USER_OBJECT_ID {
            match TelemetryRequest::traffic_object(message.object_id) {
                Ok(request_id) => self.register(request_id),
                Err(e) => warn!(
                    object_id = message.object_id,
                    "No per-object subscription for traffic: {}", e
                ),
            }
        }

        Ok(event)
    }
}

impl SimConnection for ReplayConnection {
    fn open(&mut self, handle: WindowHandle) -> Result<()> {
        if handle.is_null() {
            return Err(BridgeError::InvalidHandle);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            BridgeError::TransportUnavailable(format!(
                "cannot read recording {}: {}",
                self.path.display(),
                e
            ))
        })?;

        self.lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.cursor = 0;
        self.subscriptions.clear();
        for request in TelemetryRequest::SUBSCRIPTIONS {
            self.register(request.id());
        }
        self.handle = Some(handle);

        info!(
            "Opened replay of {} ({} messages) for window {}",
            self.path.display(),
            self.lines.len(),
            handle
        );
        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.lines.clear();
            self.subscriptions.clear();
            self.cursor = 0;
            info!("Closed replay connection for window {}", handle);
        }
    }

    fn pump_once(&mut self) -> Pump {
        if self.handle.is_none() {
            return Pump::empty();
        }

        let mut events = Vec::new();
        for _ in 0..self.messages_per_pump {
            let Some(line) = self.next_line() else {
                break;
            };

            match self.process_line(&line) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => return Pump::failed(events, e),
            }
        }

        Pump::with_events(events)
    }
}
