use std::collections::VecDeque;

use super::event::{SpeechEventKind, TelemetryEvent};
use crate::kernel::event::AlertKind;
use crate::kernel::state::Source;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub ingest_stats: IngestStats,
    pub zone_stats: ZoneStats,
    pub alert_stats: AlertStats,
    pub connectivity_stats: ConnectivityStats,
    pub speech_stats: SpeechStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    pub poll: u64,
    pub push: u64,
    pub radio: u64,
    pub dropped_payloads: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneStats {
    pub transitions: u64,
    /// Transitions that moved outward.
    pub escalations: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertStats {
    pub zone_alerts: u64,
    pub suppressed: u64,
    pub falls: u64,
    pub disconnects: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectivityStats {
    pub failures: u64,
    pub disconnects: u64,
    pub reconnects: u64,
    pub longest_outage_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechStats {
    pub started: u64,
    pub preempted: u64,
    pub deferred: u64,
    pub dropped: u64,
    pub cancelled: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut outage_started = None;

    for event in events {
        match event {
            TelemetryEvent::Ingest { source, .. } => match source {
                Source::Poll => snap.ingest_stats.poll += 1,
                Source::Push => snap.ingest_stats.push += 1,
                Source::Radio => snap.ingest_stats.radio += 1,
            },
            TelemetryEvent::PayloadDropped { .. } => snap.ingest_stats.dropped_payloads += 1,
            TelemetryEvent::ZoneTransition { from, to, .. } => {
                snap.zone_stats.transitions += 1;
                if to > from {
                    snap.zone_stats.escalations += 1;
                }
            }
            TelemetryEvent::AlertRaised { kind, .. } => match kind {
                AlertKind::Zone(_) => snap.alert_stats.zone_alerts += 1,
                AlertKind::Fall => snap.alert_stats.falls += 1,
                AlertKind::Disconnected => snap.alert_stats.disconnects += 1,
            },
            TelemetryEvent::AlertSuppressed { .. } => snap.alert_stats.suppressed += 1,
            TelemetryEvent::ChannelFailure { .. } => snap.connectivity_stats.failures += 1,
            TelemetryEvent::Connectivity { connected, at } => {
                if *connected {
                    if let Some(start) = outage_started.take() {
                        snap.connectivity_stats.reconnects += 1;
                        let outage = at.since(start);
                        if outage > snap.connectivity_stats.longest_outage_ms {
                            snap.connectivity_stats.longest_outage_ms = outage;
                        }
                    }
                } else {
                    snap.connectivity_stats.disconnects += 1;
                    outage_started = Some(*at);
                }
            }
            TelemetryEvent::Speech { event } => match event {
                SpeechEventKind::Started => snap.speech_stats.started += 1,
                SpeechEventKind::Preempted => snap.speech_stats.preempted += 1,
                SpeechEventKind::Deferred => snap.speech_stats.deferred += 1,
                SpeechEventKind::Dropped => snap.speech_stats.dropped += 1,
                SpeechEventKind::Cancelled => snap.speech_stats.cancelled += 1,
            },
            TelemetryEvent::SessionSummary { .. } => {}
        }
    }

    snap
}
