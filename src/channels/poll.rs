use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::wire::parse_status_body;
use crate::error::{GuardianError, Result};
use crate::kernel::event::Event;
use crate::kernel::state::{PartialDeviceState, Source};

/// Periodic request/response snapshot channel.
#[derive(Clone)]
pub struct Poller {
    client: Client,
    url: String,
    period: Duration,
}

impl Poller {
    pub fn new(client: Client, base_url: &str, path: &str, period_ms: u64) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            period: Duration::from_millis(period_ms.max(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<PartialDeviceState> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(GuardianError::Transport {
                channel: Source::Poll,
                message: format!("status {}", response.status()),
            });
        }
        let body = response.text().await?;
        parse_status_body(&body)
    }

    /// Poll until cancelled or the engine goes away.
    pub async fn run(self, tx: mpsc::Sender<Event>, cancel: CancellationToken) {
        info!("Polling {} every {:?}", self.url, self.period);
        let mut cadence = interval(self.period);
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.fetch() => result,
            };

            let event = match result {
                Ok(update) => Event::telemetry(Source::Poll, update),
                Err(GuardianError::MalformedPayload(reason)) => {
                    debug!("Dropping malformed status from {}: {}", self.url, reason);
                    Event::PayloadDropped { source: Source::Poll }
                }
                Err(e) => Event::failure(Source::Poll, e.to_string()),
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("Poller for {} stopped", self.url);
    }
}
