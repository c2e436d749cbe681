use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::time::Timestamp;

pub const DEFAULT_GRACE_MS: u64 = 3_000;
pub const DEFAULT_STALE_AFTER_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityStatus {
    Connected,
    /// A transport failed; waiting for any channel to prove the device reachable.
    Grace { deadline: Timestamp },
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityChange {
    pub connected: bool,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogState {
    pub last_good_update: Option<Timestamp>,
    pub failure_streak: u32,
}

/// `CONNECTED -> (failure) -> GRACE -> (deadline) -> DISCONNECTED -> (success) -> CONNECTED`
///
/// Starts `Disconnected`: nothing is known until the first good update.
#[derive(Debug)]
pub struct ConnectivityWatchdog {
    status: ConnectivityStatus,
    state: WatchdogState,
    grace_ms: u64,
    stale_after_ms: Option<u64>,
}

impl Default for ConnectivityWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_MS, Some(DEFAULT_STALE_AFTER_MS))
    }
}

impl ConnectivityWatchdog {
    pub fn new(grace_ms: u64, stale_after_ms: Option<u64>) -> Self {
        Self {
            status: ConnectivityStatus::Disconnected,
            state: WatchdogState::default(),
            grace_ms,
            stale_after_ms,
        }
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_disconnected(&self) -> bool {
        self.status == ConnectivityStatus::Disconnected
    }

    /// Any successful ingest, from any channel. Cancels a grace window.
    /// Returns a change only when recovering from `Disconnected`.
    pub fn on_success(&mut self, now: Timestamp) -> Option<ConnectivityChange> {
        self.state.last_good_update = Some(now);
        self.state.failure_streak = 0;

        let previous = self.status;
        self.status = ConnectivityStatus::Connected;
        match previous {
            ConnectivityStatus::Disconnected => {
                info!("Device reachable at {}ms", now.ms);
                Some(ConnectivityChange { connected: true, at: now })
            }
            ConnectivityStatus::Grace { .. } => {
                info!("Grace window cancelled by fresh data at {}ms", now.ms);
                None
            }
            ConnectivityStatus::Connected => None,
        }
    }

    /// A transport failure. Returns `true` exactly when this call declares the
    /// device disconnected (a failure landing after an expired deadline).
    pub fn on_failure(&mut self, now: Timestamp) -> bool {
        self.state.failure_streak = self.state.failure_streak.saturating_add(1);
        match self.status {
            ConnectivityStatus::Connected => {
                let deadline = now.plus(self.grace_ms);
                warn!(
                    "Transport failure; grace window until {}ms (streak {})",
                    deadline.ms, self.state.failure_streak
                );
                self.status = ConnectivityStatus::Grace { deadline };
                false
            }
            ConnectivityStatus::Grace { deadline } => self.expire_if_due(now, deadline),
            ConnectivityStatus::Disconnected => false,
        }
    }

    /// The backend itself reported the bracelet unreachable. Skips the grace
    /// window. Returns `true` if this call started the outage.
    pub fn mark_disconnected(&mut self, now: Timestamp) -> bool {
        if self.status == ConnectivityStatus::Disconnected {
            return false;
        }
        warn!("Device reported disconnected at {}ms", now.ms);
        self.status = ConnectivityStatus::Disconnected;
        true
    }

    /// Timer check. Returns `true` exactly once per outage.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match self.status {
            ConnectivityStatus::Grace { deadline } => self.expire_if_due(now, deadline),
            ConnectivityStatus::Connected => {
                let (Some(limit), Some(last)) = (self.stale_after_ms, self.state.last_good_update) else {
                    return false;
                };
                if now.since(last) >= limit {
                    warn!("No update for {}ms; declaring device disconnected", now.since(last));
                    self.status = ConnectivityStatus::Disconnected;
                    return true;
                }
                false
            }
            ConnectivityStatus::Disconnected => false,
        }
    }

    fn expire_if_due(&mut self, now: Timestamp, deadline: Timestamp) -> bool {
        if now < deadline {
            return false;
        }
        warn!(
            "Grace window expired after {} failures; declaring device disconnected",
            self.state.failure_streak
        );
        self.status = ConnectivityStatus::Disconnected;
        true
    }
}
