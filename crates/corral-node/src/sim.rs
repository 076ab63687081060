//! Simulated fleet: an in-process [`NodeTransport`] for tests.
//!
//! Keeps a table of fake containers per node, records every call, and lets
//! a test take nodes offline, fail destroys, or flip container status to
//! drive the orchestrator through its state machine without a network.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use corral_core::{Node, NodeId, ServiceInstance, ServiceSpec, Status};

use crate::error::{NodeError, NodeResult};
use crate::transport::NodeTransport;

/// One recorded call against the simulated fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetCall {
    Create { node: NodeId, service: String },
    Health { node: NodeId, id: String },
    Destroy { node: NodeId, id: String },
    Probe { node: NodeId },
}

#[derive(Debug)]
struct SimContainer {
    node: NodeId,
    status: Status,
}

#[derive(Debug, Default)]
struct FleetState {
    next_id: u32,
    containers: HashMap<String, SimContainer>,
    down: HashSet<NodeId>,
    failing_destroys: HashSet<NodeId>,
    failing_creates: HashSet<NodeId>,
    /// Promote CREATED containers to RUNNING on their first health poll.
    auto_start: bool,
    calls: Vec<FleetCall>,
}

/// Cloneable handle to a shared simulated fleet.
#[derive(Clone)]
pub struct SimulatedFleet {
    inner: Arc<Mutex<FleetState>>,
}

impl Default for SimulatedFleet {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFleet {
    /// A fleet whose containers start on the first health poll.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FleetState {
                auto_start: true,
                ..Default::default()
            })),
        }
    }

    /// A fleet whose containers stay CREATED until [`set_status`](Self::set_status).
    pub fn without_auto_start() -> Self {
        let fleet = Self::new();
        fleet.state().auto_start = false;
        fleet
    }

    fn state(&self) -> MutexGuard<'_, FleetState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every call to `node` fail with a transport error.
    pub fn set_node_down(&self, node: &str, down: bool) {
        let mut state = self.state();
        if down {
            state.down.insert(node.to_string());
        } else {
            state.down.remove(node);
        }
    }

    /// Make destroys on `node` fail with a provider error.
    pub fn fail_destroys_on(&self, node: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing_destroys.insert(node.to_string());
        } else {
            state.failing_destroys.remove(node);
        }
    }

    /// Make creates on `node` fail with a provider error.
    pub fn fail_creates_on(&self, node: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing_creates.insert(node.to_string());
        } else {
            state.failing_creates.remove(node);
        }
    }

    /// Force the live status of a container.
    pub fn set_status(&self, runtime_id: &str, status: Status) {
        if let Some(c) = self.state().containers.get_mut(runtime_id) {
            c.status = status;
        }
    }

    /// Remove a container behind the controller's back.
    pub fn vanish(&self, runtime_id: &str) {
        self.state().containers.remove(runtime_id);
    }

    pub fn calls(&self) -> Vec<FleetCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of create calls recorded so far.
    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, FleetCall::Create { .. }))
    }

    /// Number of destroy calls recorded so far.
    pub fn destroys(&self) -> usize {
        self.count(|c| matches!(c, FleetCall::Destroy { .. }))
    }

    fn count(&self, pred: impl Fn(&FleetCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    /// Runtime ids of live containers on `node`.
    pub fn containers_on(&self, node: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .state()
            .containers
            .iter()
            .filter(|(_, c)| c.node == node)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn unreachable(node: &Node) -> NodeError {
        NodeError::Transport {
            node: node.id.clone(),
            message: "connection refused".to_string(),
        }
    }
}

impl NodeTransport for SimulatedFleet {
    async fn create(&self, node: &Node, spec: &ServiceSpec) -> NodeResult<ServiceInstance> {
        let mut state = self.state();
        state.calls.push(FleetCall::Create {
            node: node.id.clone(),
            service: spec.name().to_string(),
        });
        if state.down.contains(&node.id) {
            return Err(Self::unreachable(node));
        }
        if state.failing_creates.contains(&node.id) {
            return Err(NodeError::Provider {
                node: node.id.clone(),
                status: 500,
                message: "image pull failed".to_string(),
            });
        }

        state.next_id += 1;
        let seq = state.next_id;
        let id = format!("sim-{seq}");
        state.containers.insert(
            id.clone(),
            SimContainer {
                node: node.id.clone(),
                status: Status::Created,
            },
        );

        Ok(ServiceInstance {
            status: Status::Created,
            service: spec.clone(),
            name: format!("{}-{seq:08x}", spec.name()),
            id,
            exposed_port: 4000 + seq as u16,
            node: node.id.clone(),
        })
    }

    async fn health(&self, node: &Node, instance: &ServiceInstance) -> NodeResult<ServiceInstance> {
        let mut state = self.state();
        state.calls.push(FleetCall::Health {
            node: node.id.clone(),
            id: instance.id.clone(),
        });
        if state.down.contains(&node.id) {
            return Err(Self::unreachable(node));
        }

        let auto_start = state.auto_start;
        let mut polled = instance.clone();
        polled.status = match state.containers.get_mut(&instance.id) {
            Some(c) => {
                if auto_start && c.status == Status::Created {
                    c.status = Status::Running;
                }
                c.status
            }
            None => Status::Stopped,
        };
        Ok(polled)
    }

    async fn destroy(&self, node: &Node, instance: &ServiceInstance) -> NodeResult<ServiceInstance> {
        let mut state = self.state();
        state.calls.push(FleetCall::Destroy {
            node: node.id.clone(),
            id: instance.id.clone(),
        });
        if state.down.contains(&node.id) {
            return Err(Self::unreachable(node));
        }
        if state.failing_destroys.contains(&node.id) {
            return Err(NodeError::Provider {
                node: node.id.clone(),
                status: 500,
                message: "container is locked".to_string(),
            });
        }

        state.containers.remove(&instance.id);
        let mut destroyed = instance.clone();
        destroyed.status = Status::Stopped;
        Ok(destroyed)
    }

    async fn probe(&self, node: &Node) -> NodeResult<()> {
        let mut state = self.state();
        state.calls.push(FleetCall::Probe {
            node: node.id.clone(),
        });
        if state.down.contains(&node.id) {
            return Err(Self::unreachable(node));
        }
        Ok(())
    }
}
