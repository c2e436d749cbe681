//! Tolerant readers for the poll and push payloads.
//!
//! The shapes belong to the backend. Anything missing, null or of the wrong
//! JSON type is treated as absent; only an unparseable body or a push event
//! without a known `type` is rejected.

use serde_json::Value;
use tracing::debug;

use crate::error::{GuardianError, Result};
use crate::kernel::event::Event;
use crate::kernel::state::{Location, PartialDeviceState, Source};

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn integer(value: &Value, key: &str) -> Option<i32> {
    number(value, key)
        .filter(|n| *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
        .map(|n| n.round() as i32)
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads `lat`/`lng`/`address` from `value`. Both coordinates must be present
/// and in range.
fn location(value: &Value) -> Option<Location> {
    let lat = number(value, "lat").filter(|lat| lat.abs() <= 90.0)?;
    let lng = number(value, "lng").filter(|lng| lng.abs() <= 180.0)?;
    Some(Location {
        lat,
        lng,
        address: text(value, "address"),
    })
}

/// Poll snapshot. Fields may sit at the top level or under `device`.
/// `proximity_zone` and `zone_color` are deliberately not read: the zone is
/// always derived locally.
pub fn parse_status(body: &Value) -> PartialDeviceState {
    let device = body.get("device").filter(|d| d.is_object()).unwrap_or(body);

    PartialDeviceState {
        connected: device.get("connected").and_then(Value::as_bool),
        location: device.get("location").and_then(location),
        distance: number(device, "distance"),
        rssi: integer(device, "rssi"),
        battery: integer(device, "battery"),
    }
}

pub fn parse_status_body(body: &str) -> Result<PartialDeviceState> {
    let value: Value = serde_json::from_str(body).map_err(|e| GuardianError::MalformedPayload(e.to_string()))?;
    if !value.is_object() {
        return Err(GuardianError::MalformedPayload("status body is not an object".to_string()));
    }
    Ok(parse_status(&value))
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Location(PartialDeviceState),
    Fall { severity: Option<String> },
    Presence(PartialDeviceState),
    /// Full snapshot, same shape as a poll body.
    Status(PartialDeviceState),
    /// The backend lost the bracelet. Always carries `connected: Some(false)`.
    Disconnected(PartialDeviceState),
}

impl PushEvent {
    pub fn into_event(self) -> Event {
        match self {
            PushEvent::Location(update)
            | PushEvent::Presence(update)
            | PushEvent::Status(update)
            | PushEvent::Disconnected(update) => Event::telemetry(Source::Push, update),
            PushEvent::Fall { severity } => Event::Fall { severity },
        }
    }
}

/// One `data:` payload from the event stream.
pub fn parse_push_event(payload: &str) -> Result<PushEvent> {
    let value: Value = serde_json::from_str(payload).map_err(|e| GuardianError::MalformedPayload(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GuardianError::MalformedPayload("missing event type".to_string()))?;

    match kind {
        "location" => {
            // Coordinates arrive flat from hardware ingest, nested from status pushes.
            let location = location(&value).or_else(|| value.get("location").and_then(location));
            Ok(PushEvent::Location(PartialDeviceState {
                connected: Some(true),
                location,
                distance: number(&value, "distance"),
                rssi: integer(&value, "rssi"),
                battery: integer(&value, "battery"),
            }))
        }
        "presence" => Ok(PushEvent::Presence(PartialDeviceState {
            connected: Some(true),
            location: None,
            distance: number(&value, "distance"),
            rssi: integer(&value, "rssi"),
            battery: integer(&value, "battery"),
        })),
        "status_update" => Ok(PushEvent::Status(parse_status(&value))),
        "device_disconnected" => Ok(PushEvent::Disconnected(PartialDeviceState {
            connected: Some(false),
            location: value.get("last_location").and_then(location),
            distance: number(&value, "distance"),
            rssi: None,
            battery: None,
        })),
        "fall" | "fall_detected" => Ok(PushEvent::Fall {
            severity: text(&value, "severity"),
        }),
        other => Err(GuardianError::MalformedPayload(format!("unknown event type '{other}'"))),
    }
}

/// Incremental server-sent-events framing. Feed raw bytes, get back complete
/// `data` payloads (multi-line data joined with `\n`).
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    /// Set after an overlong line was discarded; its tail is skipped too.
    skipping: bool,
}

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');

            if self.skipping {
                self.skipping = false;
                continue;
            }
            if line.is_empty() {
                if !self.data.is_empty() {
                    payloads.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            debug!("Discarding {} bytes of unterminated event stream line", self.buffer.len());
            self.buffer.clear();
            self.data.clear();
            self.skipping = true;
        }

        payloads
    }
}
