use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::kernel::event::Event;
use crate::kernel::state::{PartialDeviceState, Source};

/// Local signal-strength reader for a paired bracelet.
///
/// `Ok(None)` means no sample this round, which is not a failure.
pub trait RadioSource: Send {
    fn read_rssi(&mut self) -> Result<Option<i32>>;
}

/// Sweeps RSSI between -55 and -85 dBm in 5 dB steps, turning at either end.
#[derive(Debug, Clone)]
pub struct SimulatedRadio {
    rssi: i32,
    direction: i32,
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self { rssi: -60, direction: -1 }
    }
}

impl RadioSource for SimulatedRadio {
    fn read_rssi(&mut self) -> Result<Option<i32>> {
        self.rssi += self.direction * 5;
        if self.rssi <= -85 {
            self.direction = 1;
        } else if self.rssi >= -55 {
            self.direction = -1;
        }
        Ok(Some(self.rssi))
    }
}

pub struct RadioSampler<R> {
    source: R,
    period: Duration,
}

impl<R: RadioSource> RadioSampler<R> {
    pub fn new(source: R, period_ms: u64) -> Self {
        Self {
            source,
            period: Duration::from_millis(period_ms.max(1)),
        }
    }

    pub async fn run(mut self, tx: mpsc::Sender<Event>, cancel: CancellationToken) {
        let mut cadence = interval(self.period);
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let event = match self.source.read_rssi() {
                Ok(Some(rssi)) => Event::telemetry(Source::Radio, PartialDeviceState::rssi(rssi)),
                Ok(None) => continue,
                Err(e) => Event::failure(Source::Radio, e.to_string()),
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("Radio sampler stopped");
    }
}
