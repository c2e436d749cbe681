use serde::{Deserialize, Serialize};

use crate::kernel::event::AlertKind;
use crate::kernel::proximity::Zone;
use crate::kernel::speech::sequencer::Disposition;
use crate::kernel::state::Source;
use crate::kernel::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    Ingest {
        source: Source,
        at: Timestamp,
    },

    ZoneTransition {
        from: Zone,
        to: Zone,
        at: Timestamp,
    },

    AlertRaised {
        kind: AlertKind,
        at: Timestamp,
    },

    /// Escalation zone re-entered within the same excursion.
    AlertSuppressed {
        zone: Zone,
    },

    Connectivity {
        connected: bool,
        at: Timestamp,
    },

    ChannelFailure {
        source: Source,
    },

    PayloadDropped {
        source: Source,
    },

    Speech {
        event: SpeechEventKind,
    },

    SessionSummary {
        duration_ms: u64,
        alerts: u64,
        disconnects: u64,
        transitions: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechEventKind {
    Started,
    Preempted,
    Deferred,
    Dropped,
    Cancelled,
}

impl From<Disposition> for SpeechEventKind {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Started => SpeechEventKind::Started,
            Disposition::Preempted => SpeechEventKind::Preempted,
            Disposition::Deferred => SpeechEventKind::Deferred,
            Disposition::Dropped => SpeechEventKind::Dropped,
        }
    }
}
