use super::speech::request::DEFAULT_RATE;
use super::speech::{AnnouncementRequest, HapticPattern};
use super::state::DeviceState;
use super::time::Timestamp;
use super::watchdog::ConnectivityChange;

/// What the reminder wants done on this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderDue {
    pub announcement: Option<AnnouncementRequest>,
    pub vibration: Option<HapticPattern>,
}

/// Repeats the last known whereabouts while the bracelet is unreachable,
/// with an escalation vibration on its own, shorter cadence.
#[derive(Debug)]
pub struct DisconnectReminder {
    interval_ms: Option<u64>,
    haptic_interval_ms: Option<u64>,
    rate: f32,
    next_due: Option<Timestamp>,
    next_haptic: Option<Timestamp>,
}

impl Default for DisconnectReminder {
    fn default() -> Self {
        Self::new(Some(10_000), Some(5_000), DEFAULT_RATE)
    }
}

impl DisconnectReminder {
    pub fn new(interval_ms: Option<u64>, haptic_interval_ms: Option<u64>, rate: f32) -> Self {
        Self {
            interval_ms,
            haptic_interval_ms,
            rate,
            next_due: None,
            next_haptic: None,
        }
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.next_due
    }

    pub fn next_haptic(&self) -> Option<Timestamp> {
        self.next_haptic
    }

    pub fn on_connectivity(&mut self, change: &ConnectivityChange) {
        let arm = |interval: Option<u64>| interval.filter(|_| !change.connected).map(|i| change.at.plus(i));
        self.next_due = arm(self.interval_ms);
        self.next_haptic = arm(self.haptic_interval_ms);
    }

    pub fn poll(&mut self, now: Timestamp, state: &DeviceState) -> ReminderDue {
        let mut due = ReminderDue::default();

        if let (Some(at), Some(interval)) = (self.next_due, self.interval_ms) {
            if now >= at {
                self.next_due = Some(now.plus(interval));
                due.announcement = Some(last_seen_announcement(state).with_rate(self.rate));
            }
        }
        if let (Some(at), Some(interval)) = (self.next_haptic, self.haptic_interval_ms) {
            if now >= at {
                self.next_haptic = Some(now.plus(interval));
                due.vibration = Some(HapticPattern::escalation());
            }
        }

        due
    }

    pub fn stop(&mut self) {
        self.next_due = None;
        self.next_haptic = None;
    }
}

/// "Child last seen at ..." with distance as a second segment when known.
pub fn last_seen_announcement(state: &DeviceState) -> AnnouncementRequest {
    let first = match &state.location {
        Some(location) => format!("Child last seen at {}.", location.label()),
        None => "Child location unknown.".to_string(),
    };
    let mut request = AnnouncementRequest::normal(first);
    if let Some(distance) = state.distance {
        request = request.then(format!("Distance: {} meters.", distance.round() as i64));
    }
    request
}
