use serde::{Deserialize, Serialize};

use crate::kernel::proximity::Zone;
use crate::kernel::time::Timestamp;

/// Which producer delivered an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Poll,
    Push,
    Radio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// Best-effort label: a geocoded address when the source had one,
    /// otherwise the raw coordinates.
    pub address: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, address: None }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Address to speak or display. Falls back to `"lat, lng"`.
    pub fn label(&self) -> String {
        match &self.address {
            Some(addr) if !addr.trim().is_empty() => addr.clone(),
            _ => format!("{:.4}, {:.4}", self.lat, self.lng),
        }
    }
}

/// The canonical, reconciled view of the bracelet.
///
/// Only the reconciler mutates this. Every other component receives a clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub connected: bool,
    pub location: Option<Location>,
    pub distance: Option<f64>,
    pub rssi: Option<i32>,
    /// Derived by the classifier. Never copied from a source.
    pub proximity_zone: Zone,
    pub battery: Option<i32>,
    pub last_update_source: Option<Source>,
    pub last_update_time: Option<Timestamp>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            connected: false,
            location: None,
            distance: None,
            rssi: None,
            proximity_zone: Zone::VeryClose,
            battery: None,
            last_update_source: None,
            last_update_time: None,
        }
    }
}

/// A partial update from one channel. `None` means "this source said nothing",
/// never "clear the field".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialDeviceState {
    pub connected: Option<bool>,
    pub location: Option<Location>,
    pub distance: Option<f64>,
    pub rssi: Option<i32>,
    pub battery: Option<i32>,
}

impl PartialDeviceState {
    pub fn is_empty(&self) -> bool {
        self.connected.is_none()
            && self.location.is_none()
            && self.distance.is_none()
            && self.rssi.is_none()
            && self.battery.is_none()
    }

    pub fn rssi(rssi: i32) -> Self {
        Self { rssi: Some(rssi), ..Default::default() }
    }

    pub fn distance(distance: f64) -> Self {
        Self { distance: Some(distance), ..Default::default() }
    }

    pub fn presence() -> Self {
        Self { connected: Some(true), ..Default::default() }
    }
}
