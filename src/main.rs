mod cloud;
mod command;
mod config;
mod control;
mod metrics;
mod scheduler;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use cloud::CloudEvent;
use command::CommandDispatcher;
use config::AgentConfig;
use control::SupervisorActions;
use metrics::MetricSampler;
use scheduler::{IntervalTicks, PollingScheduler};
use std::sync::Arc;
use tokio::sync::mpsc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AgentConfig::from_env();

    info!("Telemetry agent starting");
    info!("  Readings period: {}s", config.readings_period_secs);
    match &config.supervisor.address {
        Some(address) => info!("  Supervisor: {}", address),
        None => warn!("  Supervisor address not set, device controls unavailable"),
    }

    // Identity and connection failures are fatal
    let identity = cloud::resolve_identity(&config.cloud).await?;
    let (publisher, mut events) = cloud::connect(&identity, config.cloud.mqtt_port).await?;
    info!("Connected to platform as {}", identity.client_id());

    let actions = Arc::new(SupervisorActions::new(config.supervisor.clone())?);
    let dispatcher = CommandDispatcher::new(actions, config.failure_policy);

    // Spawn inbound command handler
    tokio::spawn(async move {
        handle_cloud_events(&mut events, &dispatcher).await;
    });

    // Main data loop
    let mut scheduler = PollingScheduler::new(config.readings_period_secs);
    let mut ticks = IntervalTicks::default();
    let mut sampler = MetricSampler::new();
    scheduler.run(&mut ticks, &mut sampler, &publisher).await;

    Ok(())
}

/// Handle events from the cloud connection
async fn handle_cloud_events(
    events: &mut mpsc::Receiver<CloudEvent>,
    dispatcher: &CommandDispatcher,
) {
    loop {
        match events.recv().await {
            Some(CloudEvent::Connected) => {
                info!("[CLOUD] Reconnected");
            }
            Some(CloudEvent::Disconnected { reason }) => {
                warn!("[CLOUD] Disconnected: {}", reason);
            }
            Some(CloudEvent::Command(command)) => {
                dispatcher.dispatch(&command).await;
            }
            None => {
                error!("[CLOUD] Event channel closed");
                break;
            }
        }
    }
}
