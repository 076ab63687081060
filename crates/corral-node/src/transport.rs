//! The node transport contract.

use std::future::Future;

use corral_core::{Node, ServiceInstance, ServiceSpec};

use crate::error::NodeResult;

/// Synchronous request/response operations against one node's agent.
///
/// Implementations must be cheap to clone or share; the orchestrator and
/// the read-only API hold their own handles.
pub trait NodeTransport: Send + Sync + 'static {
    /// Ask the agent to create and start a container for `spec`.
    ///
    /// The returned instance is stamped with `node.id`, since the agent has
    /// no idea which id the controller gave it.
    fn create(
        &self,
        node: &Node,
        spec: &ServiceSpec,
    ) -> impl Future<Output = NodeResult<ServiceInstance>> + Send;

    /// Ask the agent for the live status of `instance`.
    fn health(
        &self,
        node: &Node,
        instance: &ServiceInstance,
    ) -> impl Future<Output = NodeResult<ServiceInstance>> + Send;

    /// Ask the agent to stop and remove `instance`.
    fn destroy(
        &self,
        node: &Node,
        instance: &ServiceInstance,
    ) -> impl Future<Output = NodeResult<ServiceInstance>> + Send;

    /// Liveness probe: succeeds if the agent answers `GET /` with 2xx.
    fn probe(&self, node: &Node) -> impl Future<Output = NodeResult<()>> + Send;
}
