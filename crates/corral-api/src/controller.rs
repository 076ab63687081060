//! Controller read API.
//!
//! Handlers only ever see the snapshot published by the control loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;

use corral_core::payload::ApiInfo;
use corral_core::{Node, Project, ServiceInstance, Snapshot};
use corral_node::NodeTransport;
use corral_orchestrator::{StateView, live_routing_config};
use corral_routing::RoutingConfig;

use crate::CONTROLLER_NAME;

/// Shared state for controller handlers.
pub struct ControllerState<T> {
    pub view: StateView,
    pub transport: Arc<T>,
}

impl<T> Clone for ControllerState<T> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> ControllerState<T> {
    /// Latest published snapshot. The watch borrow is released on return.
    fn current(&self) -> Arc<Snapshot> {
        self.view.borrow().clone()
    }
}

/// A project with its current RUNNING count.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub healthy: usize,
    #[serde(flatten)]
    pub project: Project,
}

pub fn controller_router<T: NodeTransport>(view: StateView, transport: T) -> Router {
    let state = ControllerState {
        view,
        transport: Arc::new(transport),
    };

    Router::new()
        .route("/", get(index))
        .route("/projects", get(list_projects::<T>))
        .route("/services", get(list_services::<T>))
        .route("/nodes", get(list_nodes::<T>))
        .route("/routing-config", get(routing_config::<T>))
        .with_state(state)
}

/// GET /
async fn index() -> Json<ApiInfo> {
    Json(ApiInfo::new(CONTROLLER_NAME))
}

/// GET /projects
async fn list_projects<T: NodeTransport>(
    State(state): State<ControllerState<T>>,
) -> Json<Vec<ProjectView>> {
    let snapshot = state.current();
    let projects = snapshot
        .projects
        .iter()
        .map(|p| ProjectView {
            healthy: snapshot.count_healthy(&p.name).unwrap_or(0),
            project: p.clone(),
        })
        .collect();
    Json(projects)
}

/// GET /services
async fn list_services<T: NodeTransport>(
    State(state): State<ControllerState<T>>,
) -> Json<Vec<ServiceInstance>> {
    Json(state.current().list_services())
}

/// GET /nodes
async fn list_nodes<T: NodeTransport>(
    State(state): State<ControllerState<T>>,
) -> Json<BTreeMap<String, Node>> {
    let nodes = state
        .current()
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.clone()))
        .collect();
    Json(nodes)
}

/// GET /routing-config
async fn routing_config<T: NodeTransport>(
    State(state): State<ControllerState<T>>,
) -> Json<RoutingConfig> {
    let snapshot = state.current();
    Json(live_routing_config(&snapshot, state.transport.as_ref()).await)
}
