use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request::{AnnouncementRequest, HapticPattern, Priority};
use crate::kernel::time::Timestamp;

/// Gap inserted between segments of one multi-line request.
pub const DEFAULT_SEGMENT_PAUSE_MS: u64 = 500;

/// Identifies one segment of one request. The sink echoes it back on completion,
/// which is how stale completions from cancelled speech are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId {
    pub request: u64,
    pub segment: usize,
}

/// Instructions for the audio and haptic sinks.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechCommand {
    Speak { utterance: UtteranceId, text: String, rate: f32 },
    Vibrate(HapticPattern),
    /// Silence the sinks immediately.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Speaking { segment: usize },
    Pausing { next: usize, resume_at: Timestamp },
}

/// What happened to an enqueued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Sequencer was idle; playback began.
    Started,
    /// The request in flight was cut and this one began.
    Preempted,
    /// Parked in the pending slot behind a multi-segment request.
    Deferred,
    /// Discarded (urgent playback active, or nothing to say).
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueOutcome {
    pub disposition: Disposition,
    pub commands: Vec<SpeechCommand>,
}

#[derive(Debug, Clone)]
struct ActiveRequest {
    id: u64,
    request: AnnouncementRequest,
}

/// Serializes announcements onto a single-consumer audio sink.
///
/// `IDLE -> SPEAKING(i) -> PAUSING -> SPEAKING(i+1) -> ... -> IDLE`
///
/// Segment completion comes from the sink (`on_finished`); the pause between
/// segments is resolved by `poll`. Only one `Speak` is outstanding at a time.
#[derive(Debug)]
pub struct SpeechSequencer {
    state: SequencerState,
    active: Option<ActiveRequest>,
    pending: Option<AnnouncementRequest>,
    next_id: u64,
    pause_ms: u64,
}

impl Default for SpeechSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_PAUSE_MS)
    }
}

impl SpeechSequencer {
    pub fn new(pause_ms: u64) -> Self {
        Self {
            state: SequencerState::Idle,
            active: None,
            pending: None,
            next_id: 0,
            pause_ms,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SequencerState::Idle
    }

    pub fn active_request(&self) -> Option<&AnnouncementRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    pub fn active_priority(&self) -> Option<Priority> {
        self.active.as_ref().map(|a| a.request.priority)
    }

    pub fn pending_request(&self) -> Option<&AnnouncementRequest> {
        self.pending.as_ref()
    }

    pub fn enqueue(&mut self, request: AnnouncementRequest) -> EnqueueOutcome {
        if request.segments.is_empty() {
            debug!("Dropping empty announcement");
            return EnqueueOutcome { disposition: Disposition::Dropped, commands: Vec::new() };
        }

        let (disposition, commands) = match self.active_priority() {
            None => (Disposition::Started, self.start(request)),

            Some(Priority::Urgent) => match request.priority {
                // Newest danger wins.
                Priority::Urgent => (Disposition::Preempted, self.preempt(request)),
                Priority::Normal => {
                    debug!("Dropping normal announcement while urgent playback is active");
                    (Disposition::Dropped, Vec::new())
                }
            },

            Some(Priority::Normal) => match request.priority {
                Priority::Urgent => (Disposition::Preempted, self.preempt(request)),
                Priority::Normal => {
                    let mid_sequence = self
                        .active
                        .as_ref()
                        .map(|a| a.request.is_multi_segment())
                        .unwrap_or(false);
                    if mid_sequence {
                        // One pending slot: the newest hint replaces a stale one.
                        self.pending = Some(request);
                        (Disposition::Deferred, Vec::new())
                    } else {
                        (Disposition::Preempted, self.preempt(request))
                    }
                }
            },
        };

        EnqueueOutcome { disposition, commands }
    }

    /// Sink reports an utterance finished. Completions that do not match the
    /// segment currently speaking are ignored.
    pub fn on_finished(&mut self, utterance: UtteranceId, now: Timestamp) -> Vec<SpeechCommand> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        if active.id != utterance.request || self.state != (SequencerState::Speaking { segment: utterance.segment }) {
            debug!("Ignoring stale completion {:?}", utterance);
            return Vec::new();
        }

        let next = utterance.segment + 1;
        if next < active.request.segments.len() {
            if self.pause_ms == 0 {
                return self.speak_segment(next);
            }
            self.state = SequencerState::Pausing {
                next,
                resume_at: now.plus(self.pause_ms),
            };
            return Vec::new();
        }

        self.active = None;
        self.state = SequencerState::Idle;
        match self.pending.take() {
            Some(request) => self.start(request),
            None => Vec::new(),
        }
    }

    /// Resume after an inter-segment pause once its deadline has passed.
    pub fn poll(&mut self, now: Timestamp) -> Vec<SpeechCommand> {
        match self.state {
            SequencerState::Pausing { next, resume_at } if now >= resume_at => self.speak_segment(next),
            _ => Vec::new(),
        }
    }

    /// Return to `Idle` and discard everything, including the pending slot.
    pub fn cancel_all(&mut self) -> Vec<SpeechCommand> {
        let was_active = self.active.is_some();
        self.active = None;
        self.pending = None;
        self.state = SequencerState::Idle;
        if was_active {
            vec![SpeechCommand::Stop]
        } else {
            Vec::new()
        }
    }

    fn preempt(&mut self, request: AnnouncementRequest) -> Vec<SpeechCommand> {
        let mut commands = self.cancel_all();
        commands.extend(self.start(request));
        commands
    }

    fn start(&mut self, request: AnnouncementRequest) -> Vec<SpeechCommand> {
        let id = self.next_id;
        self.next_id += 1;

        let mut commands = Vec::new();
        if let Some(pattern) = &request.haptic {
            commands.push(SpeechCommand::Vibrate(pattern.clone()));
        }
        self.active = Some(ActiveRequest { id, request });
        commands.extend(self.speak_segment(0));
        commands
    }

    fn speak_segment(&mut self, segment: usize) -> Vec<SpeechCommand> {
        let Some(active) = &self.active else {
            self.state = SequencerState::Idle;
            return Vec::new();
        };
        self.state = SequencerState::Speaking { segment };
        vec![SpeechCommand::Speak {
            utterance: UtteranceId { request: active.id, segment },
            text: active.request.segments[segment].clone(),
            rate: active.request.rate,
        }]
    }
}
