use serde::{Deserialize, Serialize};

/// Speaking rate for every utterance unless configured otherwise.
pub const DEFAULT_RATE: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Hover and navigation hints.
    Normal,
    /// Safety alerts. Preempt anything in flight.
    Urgent,
}

/// Vibration pattern: alternating on/off durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticPattern(pub Vec<u32>);

impl HapticPattern {
    pub fn escalation() -> Self {
        HapticPattern(vec![200, 100, 200, 100, 200])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRequest {
    pub segments: Vec<String>,
    pub priority: Priority,
    pub rate: f32,
    /// Played once when the request starts speaking.
    pub haptic: Option<HapticPattern>,
}

impl AnnouncementRequest {
    pub fn new(priority: Priority, segments: Vec<String>) -> Self {
        Self {
            segments,
            priority,
            rate: DEFAULT_RATE,
            haptic: None,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(Priority::Normal, vec![text.into()])
    }

    pub fn urgent(text: impl Into<String>) -> Self {
        Self::new(Priority::Urgent, vec![text.into()])
    }

    pub fn then(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_haptic(mut self, pattern: HapticPattern) -> Self {
        self.haptic = Some(pattern);
        self
    }

    pub fn is_multi_segment(&self) -> bool {
        self.segments.len() > 1
    }
}
