use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::wire::{parse_push_event, SseDecoder};
use crate::error::{GuardianError, Result};
use crate::kernel::event::Event;
use crate::kernel::state::Source;

enum StreamEnd {
    Cancelled,
    EngineGone,
}

/// Long-lived server-sent-events subscription.
pub struct PushSubscriber {
    client: Client,
    url: String,
    retry: Duration,
}

impl PushSubscriber {
    /// `client` must not carry a total request timeout; the stream never ends on its own.
    pub fn new(client: Client, base_url: &str, path: &str, retry_ms: u64) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            retry: Duration::from_millis(retry_ms),
        }
    }

    /// Subscribe, resubscribing after `retry` whenever the stream drops.
    /// Every drop is reported to the engine as a push failure.
    pub async fn run(self, tx: mpsc::Sender<Event>, cancel: CancellationToken) {
        info!("Subscribing to {}", self.url);

        loop {
            let reason = match self.stream_once(&tx, &cancel).await {
                Ok(StreamEnd::Cancelled) | Ok(StreamEnd::EngineGone) => break,
                Err(e) => e.to_string(),
            };

            if tx.send(Event::failure(Source::Push, reason)).await.is_err() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.retry) => {}
            }
        }
        debug!("Push subscription to {} closed", self.url);
    }

    async fn stream_once(&self, tx: &mpsc::Sender<Event>, cancel: &CancellationToken) -> Result<StreamEnd> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            response = self.client.get(&self.url).header(ACCEPT, "text/event-stream").send() => response?,
        };
        if !response.status().is_success() {
            return Err(GuardianError::Transport {
                channel: Source::Push,
                message: format!("status {}", response.status()),
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                chunk = stream.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(GuardianError::Transport {
                        channel: Source::Push,
                        message: "stream closed by server".to_string(),
                    })
                }
            };

            for payload in decoder.feed(&bytes) {
                let event = match parse_push_event(&payload) {
                    Ok(event) => event.into_event(),
                    Err(e) => {
                        debug!("Dropping push payload: {}", e);
                        Event::PayloadDropped { source: Source::Push }
                    }
                };
                if tx.send(event).await.is_err() {
                    return Ok(StreamEnd::EngineGone);
                }
            }
        }
    }
}
