//! Live routing projection.

use corral_core::Snapshot;
use corral_node::NodeTransport;
use corral_routing::RoutingConfig;
use tracing::debug;

/// Re-check every instance's health against its node, then project.
///
/// Works on a copy of `snapshot`: a successful poll replaces the instance's
/// status, a failed poll (or an unknown node) drops the instance from this
/// projection only. Nothing is written back.
pub async fn live_routing_config<T: NodeTransport>(
    snapshot: &Snapshot,
    transport: &T,
) -> RoutingConfig {
    let mut view = snapshot.clone();

    for instances in view.project_services.values_mut() {
        let mut live = Vec::with_capacity(instances.len());
        for inst in instances.drain(..) {
            let Some(node) = snapshot.node(&inst.node) else {
                debug!(id = %inst.id, node = %inst.node, "instance on unknown node, not routed");
                continue;
            };
            match transport.health(node, &inst).await {
                Ok(mut polled) => {
                    polled.node = inst.node;
                    live.push(polled);
                }
                Err(e) => {
                    debug!(id = %inst.id, node = %node.id, error = %e, "health re-check failed, not routed");
                }
            }
        }
        *instances = live;
    }

    corral_routing::project(&view)
}
