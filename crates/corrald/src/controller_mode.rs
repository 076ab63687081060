//! Controller mode.
//!
//! 1. Opens the state store under `home`
//! 2. Recovers the persisted snapshot, or bootstraps from descriptors
//! 3. Runs the reconciliation loop on its own task
//! 4. Serves the read API until Ctrl-C, then stops the loop between ticks

use std::net::SocketAddr;

use tokio::sync::watch;
use tracing::{error, info};

use corral_core::CorralConfig;
use corral_node::HttpTransport;
use corral_orchestrator::{Controller, OrchestratorConfig};
use corral_state::StateStore;

pub async fn run_controller(config: CorralConfig) -> anyhow::Result<()> {
    info!(version = corral_core::VERSION, "Corral controller starting");

    // ── State store ──────────────────────────────────────────────
    let db_path = config.state_path();
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // ── Orchestrator ─────────────────────────────────────────────
    let transport = HttpTransport::new(&config.secret, config.request_timeout());
    let orchestrator = corral_orchestrator::boot(
        transport.clone(),
        store,
        OrchestratorConfig::from(&config),
        &config.nodes_dir,
        &config.projects_dir,
    )
    .await?;
    info!(
        nodes = orchestrator.nodes().len(),
        projects = orchestrator.projects().len(),
        "orchestrator ready"
    );

    // ── Control loop ─────────────────────────────────────────────
    let (controller, view) = Controller::new(orchestrator, config.tick_interval());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(controller.run(shutdown_rx));

    // ── Read API ─────────────────────────────────────────────────
    let router = corral_api::controller_router(view, transport);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.controller_port));
    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // The loop finishes its current tick before returning.
    let orchestrator = loop_handle.await?;
    orchestrator.persist()?;

    info!("controller stopped");
    Ok(())
}
