use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::proximity::Zone;
use super::speech::{AnnouncementRequest, UtteranceId};
use super::state::{PartialDeviceState, Source};
use super::time::Timestamp;
use super::watchdog::ConnectivityChange;

/// Everything the reactor consumes. Producers never touch state directly.
#[derive(Debug, Clone)]
pub enum Event {
    /// A partial snapshot from one of the three channels.
    Telemetry { source: Source, update: PartialDeviceState },
    /// The bracelet reported a fall.
    Fall { severity: Option<String> },
    /// A channel request failed or its stream dropped.
    ChannelFailure { source: Source, reason: String },
    /// A payload arrived but could not be parsed. Counted, never applied.
    PayloadDropped { source: Source },
    /// The speech sink finished an utterance.
    UtteranceFinished(UtteranceId),
    /// Hover or navigation hint from the presentation layer.
    Announce(AnnouncementRequest),
    /// Silence all speech (view changed, user request).
    CancelSpeech,
}

impl Event {
    pub fn telemetry(source: Source, update: PartialDeviceState) -> Self {
        Event::Telemetry { source, update }
    }

    pub fn failure(source: Source, reason: impl Into<String>) -> Self {
        Event::ChannelFailure { source, reason: reason.into() }
    }
}

/// Produced once per reconciliation pass in which the zone changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTransition {
    pub from: Zone,
    pub to: Zone,
    pub at: Timestamp,
}

impl ZoneTransition {
    pub fn new(from: Zone, to: Zone, at: Timestamp) -> Self {
        Self { from, to, at }
    }

    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Zone(Zone),
    Disconnected,
    Fall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub kind: AlertKind,
    pub at: Timestamp,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, at: Timestamp) -> Self {
        Self { id: Uuid::new_v4(), kind, at }
    }
}

/// Stream handed to the presentation layer. The engine renders nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ZoneChanged(ZoneTransition),
    Alert(AlertEvent),
    Connectivity(ConnectivityChange),
    Fall { severity: Option<String>, at: Timestamp },
}
