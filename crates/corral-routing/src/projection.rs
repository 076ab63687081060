//! State → routing configuration.

use tracing::debug;

use corral_core::Snapshot;

use crate::config::*;

/// Router name for a project.
pub fn router_name(project: &str) -> String {
    format!("{project}-router")
}

/// Build the routing configuration for `snapshot`.
///
/// Every declared project yields a router and a service, even with no
/// RUNNING instance, so consumers can tell "declared but backend-less"
/// apart from "not declared". Instances whose owning node is unknown are
/// skipped.
///
/// Statuses are taken as they are in `snapshot`; callers wanting live
/// reachability re-check health before projecting.
pub fn project(snapshot: &Snapshot) -> RoutingConfig {
    let mut config = RoutingConfig::default();

    for project in &snapshot.projects {
        config.http.routers.insert(
            router_name(&project.name),
            RouterRule {
                rule: format!("Host(`{}`)", project.configuration.host),
                service: project.name.clone(),
            },
        );

        let servers: Vec<Server> = snapshot
            .project_services
            .get(&project.name)
            .into_iter()
            .flatten()
            .filter(|inst| inst.status.is_routable())
            .filter_map(|inst| {
                let node = snapshot.node(&inst.node)?;
                Some(Server {
                    url: format!("http://{}:{}", node.address, inst.exposed_port),
                })
            })
            .collect();

        debug!(project = %project.name, backends = servers.len(), "projected service");

        config.http.services.insert(
            project.name.clone(),
            BackendService {
                load_balancer: LoadBalancer { servers },
            },
        );
    }

    config
}
