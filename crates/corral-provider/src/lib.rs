//! Corral provider: creates, inspects, and removes the containers that back
//! service instances on an agent's host.

pub mod docker;
pub mod error;
#[cfg(any(test, feature = "sim"))]
pub mod memory;
pub mod naming;
pub mod provider;

pub use docker::DockerProvider;
pub use error::{ProviderError, ProviderResult};
#[cfg(any(test, feature = "sim"))]
pub use memory::MemoryProvider;
pub use provider::Provider;
