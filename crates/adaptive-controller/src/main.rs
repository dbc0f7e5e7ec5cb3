//! Adaptive routing controller - Main Entry Point

use adaptive_common::AdaptiveError;
use adaptive_te::{AdaptiveConfig, LoggingActuator, RemoteControlChannel, StaticTelemetry, TrafficEngine};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Adaptive controller v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "/etc/adaptive/controller.json".into());

    let config = match AdaptiveConfig::load(&config_path) {
        Ok(config) => config,
        Err(AdaptiveError::Io(e)) => {
            tracing::warn!("Config {} not readable ({}), using defaults", config_path, e);
            AdaptiveConfig::default()
        }
        Err(e) => return Err(e).with_context(|| format!("invalid config {}", config_path)),
    };

    let telemetry = Arc::new(StaticTelemetry::new());
    let engine = Arc::new(TrafficEngine::new(&config, telemetry, Arc::new(LoggingActuator))?);
    if !engine.selector().is_routing_enabled() {
        tracing::info!(
            switches = config.expected_topology.switches,
            links = config.expected_topology.links,
            "Waiting for topology"
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = tokio::spawn(engine.monitor().run(shutdown_rx.clone()));

    let control = RemoteControlChannel::bind(config.control_addr, engine.clone())
        .await
        .with_context(|| format!("cannot bind control channel on {}", config.control_addr))?;
    let control = tokio::spawn(control.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    shutdown_tx.send(true)?;

    let (monitor, control) = tokio::join!(monitor, control);
    finished_cleanly("monitor", monitor);
    finished_cleanly("control channel", control);
    Ok(())
}

/// Log a task that panicked or was cancelled
fn finished_cleanly(name: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{} task ended abnormally: {}", name, e);
            false
        }
    }
}
