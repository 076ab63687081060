//! The control loop.
//!
//! [`Controller`] owns the [`Orchestrator`] for its whole life: it is the
//! single writer. After every tick it publishes an immutable snapshot on a
//! `watch` channel, which is all the API handlers ever read.

use std::sync::Arc;
use std::time::Duration;

use corral_core::Snapshot;
use corral_node::NodeTransport;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::OrchestratorResult;
use crate::orchestrator::{Orchestrator, TickReport};

/// Read side of the published controller state.
pub type StateView = watch::Receiver<Arc<Snapshot>>;

pub struct Controller<T: NodeTransport> {
    orchestrator: Orchestrator<T>,
    interval: Duration,
    view: watch::Sender<Arc<Snapshot>>,
}

impl<T: NodeTransport> Controller<T> {
    /// Wrap an orchestrator; the returned view already holds its current state.
    pub fn new(orchestrator: Orchestrator<T>, interval: Duration) -> (Self, StateView) {
        let (view, rx) = watch::channel(Arc::new(orchestrator.snapshot().clone()));
        (
            Self {
                orchestrator,
                interval,
                view,
            },
            rx,
        )
    }

    /// One tick: node liveness, reconciliation, publish.
    ///
    /// The snapshot is published even when reconciliation fails, since a
    /// failed tick may still have changed state.
    pub async fn tick(&mut self) -> OrchestratorResult<TickReport> {
        let healthy = self.orchestrator.run_healthcheck().await;
        let result = self.orchestrator.update().await;
        self.publish();

        if let Ok(report) = &result
            && (!report.is_noop() || report.marked_unhealthy > 0)
        {
            info!(
                healthy_nodes = healthy,
                created = report.created,
                destroyed = report.destroyed,
                unhealthy = report.marked_unhealthy,
                "tick applied changes"
            );
        }
        result
    }

    fn publish(&self) {
        self.view
            .send_replace(Arc::new(self.orchestrator.snapshot().clone()));
    }

    /// Tick every `interval` until `shutdown` flips to `true` (or its
    /// sender is dropped). A tick in progress always runs to completion.
    ///
    /// Hands the orchestrator back so the caller can inspect final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Orchestrator<T> {
        info!(interval_secs = self.interval.as_secs(), "control loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "could not update state");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("control loop stopped");
        self.orchestrator
    }
}
