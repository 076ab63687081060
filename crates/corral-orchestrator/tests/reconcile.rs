//! Reconciliation behaviour across several ticks, driven by a simulated fleet.

use std::collections::HashMap;

use corral_core::{Node, Project, ProjectConfiguration, Status};
use corral_node::{FleetCall, SimulatedFleet};
use corral_orchestrator::{Orchestrator, OrchestratorConfig};
use corral_state::StateStore;

fn node(i: usize) -> Node {
    Node {
        id: format!("node-{i}"),
        address: format!("10.0.0.{}", i + 1),
        api_port: 6060,
        labels: Vec::new(),
        healthy: true,
    }
}

fn project(name: &str, image: &str, count: u32) -> Project {
    Project {
        name: name.to_string(),
        configuration: ProjectConfiguration {
            image: image.to_string(),
            count,
            container_port: 80,
            host: format!("{name}.example.com"),
        },
    }
}

fn setup(fleet: &SimulatedFleet, nodes: usize, store: StateStore) -> Orchestrator<SimulatedFleet> {
    let mut orch = Orchestrator::new(fleet.clone(), store, OrchestratorConfig::default());
    for i in 0..nodes {
        orch.add_node(node(i)).unwrap();
    }
    orch
}

#[tokio::test]
async fn converges_one_instance_per_tick() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 3, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 4)).unwrap();

    for tick in 1..=4 {
        let report = orch.update().await.unwrap();
        assert_eq!(report.created, 1, "tick {tick}");
        assert_eq!(orch.list_services().len(), tick);
    }

    // One more tick promotes the last CREATED instance.
    orch.update().await.unwrap();
    assert_eq!(orch.count_healthy("web").unwrap(), 4);
}

#[tokio::test]
async fn converged_state_is_a_fixed_point() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 2, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 2)).unwrap();
    for _ in 0..3 {
        orch.update().await.unwrap();
    }
    assert_eq!(orch.count_healthy("web").unwrap(), 2);

    let before = orch.snapshot().clone();
    fleet.clear_calls();
    let report = orch.update().await.unwrap();

    assert!(report.is_noop());
    assert_eq!(orch.snapshot(), &before);
    assert!(
        fleet
            .calls()
            .iter()
            .all(|c| matches!(c, FleetCall::Health { .. }))
    );
}

#[tokio::test]
async fn round_robin_spreads_evenly() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 3, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 6)).unwrap();
    for _ in 0..6 {
        orch.update().await.unwrap();
    }

    let mut per_node: HashMap<String, usize> = HashMap::new();
    for svc in orch.list_services() {
        *per_node.entry(svc.node).or_default() += 1;
    }
    assert_eq!(per_node.len(), 3);
    assert!(per_node.values().all(|&n| n == 2));
}

#[tokio::test]
async fn round_robin_remainder_goes_to_earliest_nodes() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 3, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 5)).unwrap();
    for _ in 0..5 {
        orch.update().await.unwrap();
    }

    let per_node: Vec<usize> = orch
        .nodes()
        .iter()
        .map(|n| orch.list_services().iter().filter(|s| s.node == n.id).count())
        .collect();
    assert_eq!(per_node, vec![2, 2, 1]);
}

#[tokio::test]
async fn unhealthy_instance_is_replaced() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 2, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 2)).unwrap();
    for _ in 0..3 {
        orch.update().await.unwrap();
    }
    let victim = orch.list_services()[0].id.clone();
    fleet.set_status(&victim, Status::Unhealthy);

    // Same tick: marked, replaced, and garbage collected.
    let report = orch.update().await.unwrap();
    assert_eq!(report.marked_unhealthy, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.destroyed, 1);
    assert!(orch.list_services().iter().all(|s| s.id != victim));

    orch.update().await.unwrap();
    assert_eq!(orch.count_healthy("web").unwrap(), 2);
}

#[tokio::test]
async fn end_to_end_routing_for_two_nodes() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 2, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 2)).unwrap();

    orch.update().await.unwrap();
    orch.update().await.unwrap();

    // Second instance is still CREATED on the simulated node; the live
    // re-check starts it, so both show up.
    let routing = orch.routing_config().await;
    let mut servers = routing.servers_for("web").unwrap();
    servers.sort();
    let services = orch.list_services();
    let mut expected: Vec<String> = services
        .iter()
        .map(|s| {
            let n = orch.snapshot().node(&s.node).unwrap();
            format!("http://{}:{}", n.address, s.exposed_port)
        })
        .collect();
    expected.sort();
    assert_eq!(servers, expected);
    assert_eq!(routing.http.routers["web-router"].rule, "Host(`web.example.com`)");
}

#[tokio::test]
async fn routing_excludes_unhealthy_and_does_not_write_back() {
    let fleet = SimulatedFleet::without_auto_start();
    let mut orch = setup(&fleet, 2, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 3)).unwrap();
    for _ in 0..3 {
        orch.update().await.unwrap();
    }
    let ids: Vec<String> = orch.list_services().into_iter().map(|s| s.id).collect();
    fleet.set_status(&ids[0], Status::Running);
    fleet.set_status(&ids[1], Status::Running);
    fleet.set_status(&ids[2], Status::Unhealthy);

    let before = orch.snapshot().clone();
    let routing = orch.routing_config().await;
    assert_eq!(routing.servers_for("web").unwrap().len(), 2);
    assert_eq!(orch.snapshot(), &before);
}

#[tokio::test]
async fn routing_drops_instances_on_unreachable_nodes() {
    let fleet = SimulatedFleet::new();
    let mut orch = setup(&fleet, 2, StateStore::open_in_memory().unwrap());
    orch.create_project(project("web", "nginx", 2)).unwrap();
    for _ in 0..3 {
        orch.update().await.unwrap();
    }

    fleet.set_node_down("node-1", true);
    let routing = orch.routing_config().await;
    assert_eq!(routing.servers_for("web").unwrap(), vec!["http://10.0.0.1:4001"]);
}

#[tokio::test]
async fn state_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("corral.redb");
    let fleet = SimulatedFleet::new();

    let snapshot = {
        let store = StateStore::open(&path).unwrap();
        let mut orch = setup(&fleet, 2, store);
        orch.create_project(project("web", "nginx", 2)).unwrap();
        orch.create_project(project("api", "httpd", 1)).unwrap();
        orch.update().await.unwrap();
        orch.update().await.unwrap();
        orch.snapshot().clone()
    };

    let store = StateStore::open(&path).unwrap();
    let bytes = store.get_snapshot_bytes().unwrap().unwrap();
    let restored =
        Orchestrator::from_snapshot(&bytes, fleet, store, OrchestratorConfig::default()).unwrap();

    assert_eq!(restored.snapshot(), &snapshot);
    let names: Vec<_> = restored.projects().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["web", "api"]);
}
