//! Harbor agent
//!
//! Runs next to a Docker daemon and serves its containers, logs, events
//! and stats to remote Harbor instances over mutual TLS.

use anyhow::Result;
use harbor_agent::{api, config::AgentConfig, docker::DockerRuntime};
use harbor_lib::{
    agent::{load_server_tls, AgentServer},
    health::HealthRegistry,
    observability::{AgentMetrics, StructuredLogger},
    runtime::RuntimeClient,
    store::ContainerStore,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting harbor-agent");

    let config = AgentConfig::load()?;
    info!(host_name = %config.host_name, listen_addr = %config.listen_addr, "Agent configured");

    let health_registry = HealthRegistry::new();
    let metrics = AgentMetrics::new();

    let runtime = DockerRuntime::connect(&config.host_name).await?;
    let runtime_version = runtime.host().runtime_version;

    let store = ContainerStore::builder(Arc::new(runtime))
        .stats_history(config.stats_history)
        .removal_grace(config.removal_grace())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .build()
        .await?;

    let logger = StructuredLogger::new(store.host_id());
    logger.log_startup(AGENT_VERSION, &runtime_version, store.len());

    let tls = load_server_tls(&config.server_tls_files()).await?;
    let shutdown = CancellationToken::new();

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, shutdown.clone()));

    let server = AgentServer::new(Arc::clone(&store), AGENT_VERSION);
    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(server.serve(
        config.listen_addr,
        tls,
        health_registry.clone(),
        async move { server_shutdown.cancelled().await },
    ));

    health_registry.set_ready(true);

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false);
    shutdown.cancel();
    store.shutdown();

    match server_handle.await {
        Ok(Err(e)) => error!(error = %e, "Agent endpoint failed"),
        Err(e) => error!(error = %e, "Agent endpoint task panicked"),
        Ok(Ok(())) => {}
    }
    if let Ok(Err(e)) = api_handle.await {
        error!(error = %e, "API server failed");
    }

    info!("Shutdown complete");
    Ok(())
}
