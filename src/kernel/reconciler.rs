use tracing::{debug, info};

use super::event::ZoneTransition;
use super::proximity::{ProximityClassifier, RssiModel, RssiSmoother, RSSI_CEILING, RSSI_FLOOR};
use super::state::{DeviceState, PartialDeviceState, Source};
use super::time::Timestamp;
use super::watchdog::{ConnectivityChange, ConnectivityWatchdog};
use crate::config::{ProximityConfig, WatchdogConfig};
use crate::error::Result;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub transition: Option<ZoneTransition>,
    pub connectivity: Option<ConnectivityChange>,
}

/// Sole owner of `DeviceState`. Merges partial updates field by field,
/// derives the zone, and keeps the watchdog informed.
#[derive(Debug)]
pub struct TelemetryReconciler {
    state: DeviceState,
    classifier: ProximityClassifier,
    rssi_model: RssiModel,
    max_distance_m: f64,
    smoother: RssiSmoother,
    watchdog: ConnectivityWatchdog,
}

impl Default for TelemetryReconciler {
    fn default() -> Self {
        Self::new(
            ProximityClassifier::default(),
            RssiModel::default(),
            crate::config::DEFAULT_MAX_DISTANCE_M,
            1,
            ConnectivityWatchdog::default(),
        )
    }
}

impl TelemetryReconciler {
    pub fn new(
        classifier: ProximityClassifier,
        rssi_model: RssiModel,
        max_distance_m: f64,
        smoothing_window: usize,
        watchdog: ConnectivityWatchdog,
    ) -> Self {
        Self {
            state: DeviceState::default(),
            classifier,
            rssi_model,
            max_distance_m,
            smoother: RssiSmoother::new(smoothing_window),
            watchdog,
        }
    }

    pub fn from_config(proximity: &ProximityConfig, watchdog: &WatchdogConfig) -> Result<Self> {
        Ok(Self::new(
            ProximityClassifier::new(proximity.thresholds()?),
            proximity.rssi_model,
            proximity.max_distance_m,
            proximity.rssi_smoothing_window,
            ConnectivityWatchdog::new(watchdog.grace_ms, watchdog.stale_after_ms),
        ))
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn watchdog(&self) -> &ConnectivityWatchdog {
        &self.watchdog
    }

    /// Apply one update. Fields the update leaves empty keep their last known value.
    pub fn ingest(&mut self, update: PartialDeviceState, source: Source, now: Timestamp) -> IngestOutcome {
        // `state.connected` mirrors the watchdog: false exactly while it is `Disconnected`.
        let was_connected = self.state.connected;
        if update.connected == Some(false) {
            self.watchdog.mark_disconnected(now);
            self.state.connected = false;
        } else {
            // Fresh data from any channel overrides a disconnect.
            self.watchdog.on_success(now);
            self.state.connected = true;
        }
        let connectivity = (self.state.connected != was_connected).then(|| ConnectivityChange {
            connected: self.state.connected,
            at: now,
        });

        if let Some(mut location) = update.location {
            if location.lat.is_finite() && location.lng.is_finite() {
                if location.address.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    location.address = Some(location.label());
                }
                self.state.location = Some(location);
            } else {
                debug!("Ignoring non-finite location from {:?}", source);
            }
        }

        if let Some(battery) = update.battery {
            self.state.battery = Some(battery.clamp(0, 100));
        }

        let mut reading = None;
        if let Some(rssi) = update.rssi {
            let rssi = rssi.clamp(RSSI_FLOOR, RSSI_CEILING);
            self.state.rssi = Some(rssi);
            let effective = match source {
                Source::Radio => self.smoother.push(rssi),
                Source::Poll | Source::Push => rssi as f64,
            };
            reading = Some(self.rssi_model.distance(effective, self.max_distance_m));
        }
        // A reported distance beats one estimated from RSSI.
        if let Some(distance) = update.distance.filter(|d| d.is_finite()) {
            reading = Some(distance.max(0.0));
        }
        if let Some(distance) = reading {
            self.state.distance = Some(distance);
        }

        let previous = self.state.proximity_zone;
        let zone = self.classifier.classify(reading, previous);
        let transition = if zone != previous {
            info!("Zone {:?} -> {:?} ({:?}, {:.1} m)", previous, zone, source, reading.unwrap_or_default());
            self.state.proximity_zone = zone;
            Some(ZoneTransition::new(previous, zone, now))
        } else {
            None
        };

        self.state.last_update_source = Some(source);
        self.state.last_update_time = Some(now);

        IngestOutcome { transition, connectivity }
    }

    /// A channel failed. Device fields are untouched; only the watchdog hears it.
    pub fn report_failure(&mut self, source: Source, now: Timestamp) -> Option<ConnectivityChange> {
        debug!("Failure reported by {:?} at {}ms", source, now.ms);
        if self.watchdog.on_failure(now) {
            return Some(self.force_disconnect(now));
        }
        None
    }

    /// Resolve grace deadlines and staleness.
    pub fn poll(&mut self, now: Timestamp) -> Option<ConnectivityChange> {
        if self.watchdog.poll(now) {
            return Some(self.force_disconnect(now));
        }
        None
    }

    fn force_disconnect(&mut self, now: Timestamp) -> ConnectivityChange {
        self.state.connected = false;
        ConnectivityChange { connected: false, at: now }
    }
}
