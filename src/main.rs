use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod api;
mod config;
mod engine;
mod evaluator;
mod history;
mod models;
mod probe;
mod render;

use crate::config::MonitorConfig;
use crate::engine::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = MonitorConfig::load(&config_path)?;

    let monitor = Arc::new(Monitor::new(config)?);

    if let Some(api_port) = monitor.config.api_port {
        let state_for_api = monitor.state.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_server(api_port, state_for_api).await {
                tracing::error!("{:#}", e);
            }
        });
    }

    let shutdown = CancellationToken::new();
    let monitor_clone = Arc::clone(&monitor);
    let token = shutdown.clone();
    let engine = tokio::spawn(async move {
        monitor_clone.run(token).await;
    });

    signal::ctrl_c().await?;
    info!("Shutdown signal received. Finishing current tick...");
    shutdown.cancel();
    engine.await?;

    Ok(())
}
