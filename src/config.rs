use std::path::Path;

use serde::Deserialize;

use crate::error::{GuardianError, Result};
use crate::kernel::alert::DEFAULT_FALL_COOLDOWN_MS;
use crate::kernel::proximity::{RssiModel, ZoneThresholds};
use crate::kernel::speech::request::DEFAULT_RATE;
use crate::kernel::speech::sequencer::DEFAULT_SEGMENT_PAUSE_MS;
use crate::kernel::watchdog::{DEFAULT_GRACE_MS, DEFAULT_STALE_AFTER_MS};

pub const DEFAULT_MAX_DISTANCE_M: f64 = 200.0;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub proximity: ProximityConfig,
    pub watchdog: WatchdogConfig,
    pub speech: SpeechConfig,
    pub alerts: AlertConfig,
    pub channels: ChannelConfig,
    pub reminder: ReminderConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProximityConfig {
    /// VERY_CLOSE / NEAR / FAR edges in metres.
    pub boundaries_m: [f64; 3],
    /// Fraction of each edge a reading must undercut before the zone improves.
    pub hysteresis_ratio: f64,
    pub max_distance_m: f64,
    pub rssi_model: RssiModel,
    pub rssi_smoothing_window: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            boundaries_m: [10.0, 30.0, 60.0],
            hysteresis_ratio: 0.2,
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            rssi_model: RssiModel::default(),
            rssi_smoothing_window: 1,
        }
    }
}

impl ProximityConfig {
    pub fn thresholds(&self) -> Result<ZoneThresholds> {
        ZoneThresholds::new(self.boundaries_m, self.hysteresis_ratio)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WatchdogConfig {
    pub grace_ms: u64,
    /// `None` (or `0` in TOML) disables staleness detection.
    #[serde(deserialize_with = "zero_as_none")]
    pub stale_after_ms: Option<u64>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_GRACE_MS,
            stale_after_ms: Some(DEFAULT_STALE_AFTER_MS),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    pub rate: f32,
    pub segment_pause_ms: u64,
    pub audio: bool,
    pub haptic: bool,
    /// Text-to-speech program, e.g. `say` or `espeak`. Absent means silent.
    pub command: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            segment_pause_ms: DEFAULT_SEGMENT_PAUSE_MS,
            audio: true,
            haptic: true,
            command: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AlertConfig {
    pub fall_cooldown_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { fall_cooldown_ms: DEFAULT_FALL_COOLDOWN_MS }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ChannelConfig {
    pub base_url: String,
    pub status_path: String,
    pub status_interval_ms: u64,
    pub summary_path: Option<String>,
    pub summary_interval_ms: u64,
    pub events_path: String,
    pub push_retry_ms: u64,
    pub radio_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            status_path: "/api/status".to_string(),
            status_interval_ms: 500,
            summary_path: None,
            summary_interval_ms: 3_000,
            events_path: "/events".to_string(),
            push_retry_ms: 3_000,
            radio_interval_ms: 2_000,
            request_timeout_ms: 2_000,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReminderConfig {
    /// `None` (or `0` in TOML) disables the "last seen" reminder.
    #[serde(deserialize_with = "zero_as_none")]
    pub interval_ms: Option<u64>,
    /// Escalation vibration cadence while disconnected. `0` disables it.
    #[serde(deserialize_with = "zero_as_none")]
    pub haptic_interval_ms: Option<u64>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_ms: Some(10_000),
            haptic_interval_ms: Some(5_000),
        }
    }
}

fn zero_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = u64::deserialize(deserializer)?;
    Ok((value > 0).then_some(value))
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::de::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.proximity.thresholds()?;
        if self.proximity.max_distance_m <= 0.0 {
            return Err(GuardianError::InvalidConfig("max_distance_m must be positive".to_string()));
        }
        if self.speech.rate <= 0.0 {
            return Err(GuardianError::InvalidConfig("speech rate must be positive".to_string()));
        }
        if self.channels.status_interval_ms == 0 || self.channels.radio_interval_ms == 0 {
            return Err(GuardianError::InvalidConfig("channel intervals must be non-zero".to_string()));
        }
        Ok(())
    }
}
