//! Controller and agents wired together over real HTTP.
//!
//! Agents run the production agent router on an in-memory provider; the
//! controller side uses the production HTTP transport.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use corral_api::{agent_router, controller_router};
use corral_core::{Node, Project, ProjectConfiguration, Status};
use corral_node::HttpTransport;
use corral_orchestrator::{Controller, Orchestrator, OrchestratorConfig};
use corral_provider::MemoryProvider;
use corral_state::StateStore;

const SECRET: &str = "e2e-secret";

async fn spawn_agent(id: &str, provider: MemoryProvider) -> Node {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = agent_router(provider, SECRET);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Node {
        id: id.to_string(),
        address: "127.0.0.1".to_string(),
        api_port: port,
        labels: Vec::new(),
        healthy: false,
    }
}

fn web(count: u32) -> Project {
    Project {
        name: "web".to_string(),
        configuration: ProjectConfiguration {
            image: "nginx".to_string(),
            count,
            container_port: 80,
            host: "web.example.com".to_string(),
        },
    }
}

fn transport(secret: &str) -> HttpTransport {
    HttpTransport::new(secret, Duration::from_secs(2))
}

#[tokio::test]
async fn two_nodes_two_ticks_one_instance_each() {
    let p0 = MemoryProvider::new();
    let p1 = MemoryProvider::new();
    let n0 = spawn_agent("node-0", p0.clone()).await;
    let n1 = spawn_agent("node-1", p1.clone()).await;

    let mut orch = Orchestrator::new(
        transport(SECRET),
        StateStore::open_in_memory().unwrap(),
        OrchestratorConfig::default(),
    );
    orch.add_node(n0).unwrap();
    orch.add_node(n1).unwrap();
    orch.create_project(web(2)).unwrap();

    let (mut controller, view) = Controller::new(orch, Duration::from_secs(5));
    controller.tick().await.unwrap();
    controller.tick().await.unwrap();

    assert_eq!(p0.container_count(), 1);
    assert_eq!(p1.container_count(), 1);

    let services = view.borrow().list_services();
    assert_eq!(services.len(), 2);
    assert!(
        services
            .iter()
            .all(|s| matches!(s.status, Status::Created | Status::Running))
    );
    let mut nodes: Vec<_> = services.iter().map(|s| s.node.as_str()).collect();
    nodes.sort();
    assert_eq!(nodes, vec!["node-0", "node-1"]);

    // The read API re-checks health over HTTP before projecting.
    let router = controller_router(view.clone(), transport(SECRET));
    let req = Request::builder()
        .uri("/routing-config")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let routing: corral_routing::RoutingConfig = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(routing.servers_for("web").unwrap().len(), 2);
    assert_eq!(
        routing.http.routers["web-router"].rule,
        "Host(`web.example.com`)"
    );
}

#[tokio::test]
async fn wrong_secret_leaves_nodes_unhealthy() {
    let n0 = spawn_agent("node-0", MemoryProvider::new()).await;

    let mut orch = Orchestrator::new(
        transport("not-the-secret"),
        StateStore::open_in_memory().unwrap(),
        OrchestratorConfig::default(),
    );
    orch.add_node(n0).unwrap();

    assert_eq!(orch.run_healthcheck().await, 0);
    assert!(!orch.nodes()[0].healthy);
}

#[tokio::test]
async fn vanished_container_is_replaced() {
    let p0 = MemoryProvider::new();
    let n0 = spawn_agent("node-0", p0.clone()).await;

    let mut orch = Orchestrator::new(
        transport(SECRET),
        StateStore::open_in_memory().unwrap(),
        OrchestratorConfig::default(),
    );
    orch.add_node(n0).unwrap();
    orch.create_project(web(1)).unwrap();
    orch.update().await.unwrap();

    let first = orch.list_services()[0].clone();
    p0.set_status(&first.id, Status::Unhealthy);

    let report = orch.update().await.unwrap();
    assert_eq!(report.marked_unhealthy, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.destroyed, 1);

    let services = orch.list_services();
    assert_eq!(services.len(), 1);
    assert_ne!(services[0].id, first.id);
    assert_eq!(p0.container_count(), 1);
}
