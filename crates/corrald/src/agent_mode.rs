//! Agent mode: runs on every worker node.
//!
//! Connects to the local Docker daemon and serves the agent API that the
//! controller calls to create, inspect, and destroy containers.

use std::net::SocketAddr;

use tracing::{error, info};

use corral_core::CorralConfig;
use corral_provider::DockerProvider;

pub async fn run_agent(config: CorralConfig) -> anyhow::Result<()> {
    info!(version = corral_core::VERSION, "Corral agent starting");

    let provider = DockerProvider::connect()?;
    info!("docker provider started");

    let router = corral_api::agent_router(provider, &config.secret);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.agent_port));
    info!(%addr, controller = %config.controller_url, "listening and serving");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("agent stopped");
    Ok(())
}
