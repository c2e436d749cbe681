use serde::{Deserialize, Serialize};

/// Milliseconds on the engine's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub ms: u64,
}

/// Driver cadence. Deadlines (grace windows, speech pauses) resolve at this granularity.
pub const TICK_MS: u64 = 50;

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { ms: 0 };

    pub fn from_millis(ms: u64) -> Self {
        Timestamp { ms }
    }

    pub fn plus(&self, ms: u64) -> Self {
        Timestamp { ms: self.ms.saturating_add(ms) }
    }

    /// Milliseconds elapsed since `earlier`; zero if `earlier` is in the future.
    pub fn since(&self, earlier: Timestamp) -> u64 {
        self.ms.saturating_sub(earlier.ms)
    }
}
