use std::future::Future;

use corral_core::{ServiceInstance, ServiceSpec};

use crate::error::ProviderResult;

/// Container lifecycle on the local host.
///
/// Instances returned here never carry a node id; the controller stamps it.
pub trait Provider: Send + Sync + 'static {
    /// Create and start a container for `spec`, publishing its port on a
    /// free host port. The returned instance is CREATED.
    fn create(&self, spec: &ServiceSpec) -> impl Future<Output = ProviderResult<ServiceInstance>> + Send;

    /// Inspect the container behind `instance`. A vanished container is
    /// STOPPED, not an error.
    fn health(&self, instance: &ServiceInstance) -> impl Future<Output = ProviderResult<ServiceInstance>> + Send;

    /// Stop and remove the container. Returns the instance as STOPPED.
    fn destroy(&self, instance: &ServiceInstance) -> impl Future<Output = ProviderResult<ServiceInstance>> + Send;
}
