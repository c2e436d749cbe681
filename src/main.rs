use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use guardian::channels::{self, radio::SimulatedRadio};
use guardian::kernel::event::EngineEvent;
use guardian::outputs::Outputs;
use guardian::{EngineConfig, Reactor};

#[derive(Parser, Debug)]
#[command(name = "guardian", about = "Device presence and proximity alerting engine")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Feed a simulated radio channel alongside the network channels.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guardian=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        config.channels.base_url = base_url;
    }

    tracing::info!("Guardian booting against {}", config.channels.base_url);

    let reactor = Reactor::new(&config).context("invalid engine configuration")?;
    let engine = reactor.spawn(Outputs::from_config(&config.speech));

    let mut tasks = channels::spawn_network(&config.channels, &engine)?;
    if args.simulate {
        tracing::info!("Simulated radio enabled");
        tasks.push(channels::spawn_radio(SimulatedRadio::default(), &config.channels, &engine));
    }

    let mut events = engine.subscribe();
    let cancel = engine.cancellation();
    let logger = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(EngineEvent::ZoneChanged(t)) => tracing::info!("Zone {:?} -> {:?}", t.from, t.to),
                Ok(EngineEvent::Alert(alert)) => tracing::warn!("Alert {:?} ({})", alert.kind, alert.id),
                Ok(EngineEvent::Connectivity(change)) => tracing::info!("Connected: {}", change.connected),
                Ok(EngineEvent::Fall { severity, .. }) => tracing::warn!("Fall reported, severity {:?}", severity),
                Err(RecvError::Lagged(n)) => tracing::debug!("Event log lagged by {}", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::info!("Guardian active. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    tracing::info!("Shutting down");
    if let Some(snapshot) = engine.shutdown().await {
        tracing::info!(
            "Session: {} zone alerts, {} disconnects, {} dropped payloads",
            snapshot.alert_stats.zone_alerts,
            snapshot.connectivity_stats.disconnects,
            snapshot.ingest_stats.dropped_payloads
        );
    }
    for task in tasks {
        let _ = task.await;
    }
    let _ = logger.await;

    Ok(())
}
