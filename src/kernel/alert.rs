use serde::{Deserialize, Serialize};

use super::event::ZoneTransition;
use super::proximity::Zone;
use super::speech::request::DEFAULT_RATE;
use super::speech::{AnnouncementRequest, HapticPattern};
use super::time::Timestamp;

pub const DEFAULT_FALL_COOLDOWN_MS: u64 = 10_000;

/// "Already announced" flags for the escalation zones, one per excursion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMemory {
    pub far: bool,
    pub out_of_range: bool,
}

impl AlertMemory {
    pub fn announced(&self, zone: Zone) -> bool {
        match zone {
            Zone::Far => self.far,
            Zone::OutOfRange => self.out_of_range,
            Zone::VeryClose | Zone::Near => false,
        }
    }

    fn mark(&mut self, zone: Zone) {
        match zone {
            Zone::Far => self.far = true,
            Zone::OutOfRange => self.out_of_range = true,
            Zone::VeryClose | Zone::Near => {}
        }
    }
}

pub fn zone_message(zone: Zone) -> Option<&'static str> {
    match zone {
        Zone::Far => Some("Warning. Your child is moving far away."),
        Zone::OutOfRange => Some("Alert. Your child is out of range."),
        Zone::VeryClose | Zone::Near => None,
    }
}

/// PURE FUNCTION: (transition, memory) -> (memory', announcement).
///
/// One urgent announcement per unbroken stay in `Far` / `OutOfRange`.
/// Returning to `Near` or `VeryClose` clears the memory.
pub fn on_transition(
    transition: &ZoneTransition,
    memory: AlertMemory,
) -> (AlertMemory, Option<AnnouncementRequest>) {
    if !transition.is_change() {
        return (memory, None);
    }

    let zone = transition.to;
    if !zone.is_escalation() {
        return (AlertMemory::default(), None);
    }
    if memory.announced(zone) {
        return (memory, None);
    }

    let mut next = memory;
    next.mark(zone);
    let request = zone_message(zone).map(|text| {
        AnnouncementRequest::urgent(text)
            .with_rate(DEFAULT_RATE)
            .with_haptic(HapticPattern::escalation())
    });
    (next, request)
}

/// Owns the session's `AlertMemory` and the fall cooldown.
#[derive(Debug)]
pub struct AlertDeduplicator {
    memory: AlertMemory,
    rate: f32,
    fall_cooldown_ms: u64,
    last_fall: Option<Timestamp>,
}

impl Default for AlertDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_RATE, DEFAULT_FALL_COOLDOWN_MS)
    }
}

impl AlertDeduplicator {
    pub fn new(rate: f32, fall_cooldown_ms: u64) -> Self {
        Self {
            memory: AlertMemory::default(),
            rate,
            fall_cooldown_ms,
            last_fall: None,
        }
    }

    pub fn memory(&self) -> AlertMemory {
        self.memory
    }

    pub fn on_transition(&mut self, transition: &ZoneTransition) -> Option<AnnouncementRequest> {
        let (memory, request) = on_transition(transition, self.memory);
        self.memory = memory;
        request.map(|r| r.with_rate(self.rate))
    }

    /// Fall reports inside the cooldown window are folded into the first one.
    pub fn on_fall(&mut self, now: Timestamp) -> Option<AnnouncementRequest> {
        if let Some(last) = self.last_fall {
            if now.since(last) < self.fall_cooldown_ms {
                return None;
            }
        }
        self.last_fall = Some(now);
        Some(
            AnnouncementRequest::urgent("Alert. Possible fall detected.")
                .with_rate(self.rate)
                .with_haptic(HapticPattern::escalation()),
        )
    }

    /// The watchdog reports each outage once, so no bookkeeping here.
    pub fn on_disconnect(&self) -> AnnouncementRequest {
        AnnouncementRequest::urgent("Alert. Connection to the bracelet lost.")
            .with_rate(self.rate)
            .with_haptic(HapticPattern::escalation())
    }
}
