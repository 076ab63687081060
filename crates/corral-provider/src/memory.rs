//! In-memory [`Provider`] for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use corral_core::{ServiceInstance, ServiceSpec, Status};

use crate::error::{ProviderError, ProviderResult};
use crate::naming::container_name;
use crate::provider::Provider;

#[derive(Debug, Default)]
struct Containers {
    next_port: u16,
    by_id: HashMap<String, Status>,
    fail_creates: bool,
}

/// Containers live in a shared table; clones see the same table.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<Mutex<Containers>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Containers> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_status(&self, id: &str, status: Status) {
        if let Some(s) = self.state().by_id.get_mut(id) {
            *s = status;
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    pub fn container_count(&self) -> usize {
        self.state().by_id.len()
    }
}

impl Provider for MemoryProvider {
    async fn create(&self, spec: &ServiceSpec) -> ProviderResult<ServiceInstance> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(ProviderError::Create {
                service: spec.name().to_string(),
                message: "no such image".to_string(),
            });
        }

        state.next_port += 1;
        let port = 32000 + state.next_port;
        let name = container_name(spec.name());
        let id = format!("mem-{}", state.next_port);
        state.by_id.insert(id.clone(), Status::Running);

        Ok(ServiceInstance {
            status: Status::Created,
            service: spec.clone(),
            name,
            id,
            exposed_port: port,
            node: String::new(),
        })
    }

    async fn health(&self, instance: &ServiceInstance) -> ProviderResult<ServiceInstance> {
        let mut polled = instance.clone();
        polled.status = self
            .state()
            .by_id
            .get(&instance.id)
            .copied()
            .unwrap_or(Status::Stopped);
        Ok(polled)
    }

    async fn destroy(&self, instance: &ServiceInstance) -> ProviderResult<ServiceInstance> {
        self.state().by_id.remove(&instance.id);
        let mut out = instance.clone();
        out.status = Status::Stopped;
        Ok(out)
    }
}
