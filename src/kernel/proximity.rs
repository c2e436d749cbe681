use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{GuardianError, Result};

/// Discrete proximity classification, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    VeryClose,
    Near,
    Far,
    OutOfRange,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::VeryClose, Zone::Near, Zone::Far, Zone::OutOfRange];

    fn index(self) -> usize {
        match self {
            Zone::VeryClose => 0,
            Zone::Near => 1,
            Zone::Far => 2,
            Zone::OutOfRange => 3,
        }
    }

    fn from_index(index: usize) -> Zone {
        Zone::ALL[index.min(3)]
    }

    /// `Far` and `OutOfRange` are the zones that warrant an alert.
    pub fn is_escalation(self) -> bool {
        matches!(self, Zone::Far | Zone::OutOfRange)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Zone::VeryClose => "very close",
            Zone::Near => "near",
            Zone::Far => "far",
            Zone::OutOfRange => "out of range",
        }
    }
}

/// Boundary pairs for the three zone edges.
///
/// `worsen[k]` is the plain boundary: reaching it moves the zone outward
/// immediately. `improve[k]` sits below it and must be undercut to move back in.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneThresholds {
    worsen: [f64; 3],
    improve: [f64; 3],
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        // 10 / 30 / 60 m with a 20% band below each edge.
        Self {
            worsen: [10.0, 30.0, 60.0],
            improve: [8.0, 24.0, 48.0],
        }
    }
}

impl ZoneThresholds {
    pub fn new(boundaries: [f64; 3], hysteresis_ratio: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&hysteresis_ratio) {
            return Err(GuardianError::InvalidConfig(format!(
                "hysteresis ratio must be in [0, 1), got {hysteresis_ratio}"
            )));
        }
        let monotonic = boundaries[0] > 0.0
            && boundaries[0] < boundaries[1]
            && boundaries[1] < boundaries[2]
            && boundaries.iter().all(|b| b.is_finite());
        if !monotonic {
            return Err(GuardianError::InvalidConfig(format!(
                "zone boundaries must be positive and strictly increasing, got {boundaries:?}"
            )));
        }

        let improve = boundaries.map(|b| b * (1.0 - hysteresis_ratio));
        Ok(Self { worsen: boundaries, improve })
    }

    pub fn boundaries(&self) -> [f64; 3] {
        self.worsen
    }

    pub fn improve_thresholds(&self) -> [f64; 3] {
        self.improve
    }

    /// Zone for a distance without any history.
    pub fn zone_of(&self, distance: f64) -> Zone {
        let index = self.worsen.iter().take_while(|b| distance >= **b).count();
        Zone::from_index(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProximityClassifier {
    thresholds: ZoneThresholds,
}

impl ProximityClassifier {
    pub fn new(thresholds: ZoneThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ZoneThresholds {
        &self.thresholds
    }

    /// PURE FUNCTION: (reading, previous zone) -> zone.
    ///
    /// Outward moves follow the plain boundaries. Inward moves step one edge at a
    /// time and only while the reading is under that edge's improve threshold.
    /// No reading keeps the previous zone.
    pub fn classify(&self, reading: Option<f64>, previous: Zone) -> Zone {
        let distance = match reading {
            Some(d) if !d.is_nan() => d.max(0.0),
            _ => return previous,
        };

        let raw = self.thresholds.zone_of(distance);
        if raw > previous {
            return raw;
        }

        let mut index = previous.index();
        while index > 0 && distance < self.thresholds.improve[index - 1] {
            index -= 1;
        }
        Zone::from_index(index)
    }
}

pub const RSSI_FLOOR: i32 = -127;
pub const RSSI_CEILING: i32 = 0;

/// RSSI → metres. Both variants are monotonic (weaker signal, larger distance)
/// and saturate at the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RssiModel {
    /// `(intercept_dbm - rssi) * meters_per_db`
    Linear { intercept_dbm: f64, meters_per_db: f64 },
    /// Log-distance path loss: `10 ^ ((tx_power - rssi) / (10 * exponent))`
    PathLoss { tx_power: f64, exponent: f64 },
}

impl Default for RssiModel {
    fn default() -> Self {
        // Puts -65 dBm on the 10 m edge and -85 dBm on the 60 m edge.
        RssiModel::Linear { intercept_dbm: -61.0, meters_per_db: 2.5 }
    }
}

impl RssiModel {
    pub fn distance(&self, rssi: f64, max_distance_m: f64) -> f64 {
        let rssi = rssi.clamp(RSSI_FLOOR as f64, RSSI_CEILING as f64);
        let raw = match *self {
            RssiModel::Linear { intercept_dbm, meters_per_db } => (intercept_dbm - rssi) * meters_per_db,
            RssiModel::PathLoss { tx_power, exponent } => {
                if exponent <= 0.0 {
                    return max_distance_m;
                }
                10f64.powf((tx_power - rssi) / (10.0 * exponent))
            }
        };
        if raw.is_nan() {
            return max_distance_m;
        }
        raw.clamp(0.0, max_distance_m)
    }
}

/// Moving average over the last `window` radio samples.
#[derive(Debug, Clone)]
pub struct RssiSmoother {
    window: usize,
    samples: VecDeque<i32>,
}

impl RssiSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self { window, samples: VecDeque::with_capacity(window) }
    }

    pub fn push(&mut self, rssi: i32) -> f64 {
        let rssi = rssi.clamp(RSSI_FLOOR, RSSI_CEILING);
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(rssi);
        let sum: i64 = self.samples.iter().map(|&s| s as i64).sum();
        sum as f64 / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
