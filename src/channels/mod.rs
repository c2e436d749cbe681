//! Producers. Each runs on its own task, owns no engine state, and only ever
//! sends `Event`s into the reactor.

pub mod poll;
pub mod push;
pub mod radio;
pub mod wire;

use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config::ChannelConfig;
use crate::error::Result;
use crate::kernel::reactor::EngineHandle;
use poll::Poller;
use push::PushSubscriber;
use radio::{RadioSampler, RadioSource};

/// Start the poll and push channels against `config.base_url`.
pub fn spawn_network(config: &ChannelConfig, engine: &EngineHandle) -> Result<Vec<JoinHandle<()>>> {
    let request_client = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()?;
    let stream_client = Client::builder()
        .connect_timeout(Duration::from_millis(config.request_timeout_ms))
        .build()?;

    let mut tasks = Vec::new();

    let status = Poller::new(request_client.clone(), &config.base_url, &config.status_path, config.status_interval_ms);
    tasks.push(tokio::spawn(status.run(engine.sender(), engine.cancellation())));

    if let Some(path) = &config.summary_path {
        let summary = Poller::new(request_client, &config.base_url, path, config.summary_interval_ms);
        tasks.push(tokio::spawn(summary.run(engine.sender(), engine.cancellation())));
    }

    let push = PushSubscriber::new(stream_client, &config.base_url, &config.events_path, config.push_retry_ms);
    tasks.push(tokio::spawn(push.run(engine.sender(), engine.cancellation())));

    Ok(tasks)
}

pub fn spawn_radio<R>(source: R, config: &ChannelConfig, engine: &EngineHandle) -> JoinHandle<()>
where
    R: RadioSource + 'static,
{
    let sampler = RadioSampler::new(source, config.radio_interval_ms);
    tokio::spawn(sampler.run(engine.sender(), engine.cancellation()))
}
