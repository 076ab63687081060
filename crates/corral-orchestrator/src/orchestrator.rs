//! Orchestrator: desired vs. actual state and the reconciliation tick.
//!
//! The `Orchestrator` exclusively owns the controller's state:
//! - declared projects (desired state),
//! - tracked service instances per project (actual state),
//! - registered nodes.
//!
//! Every mutation goes through `&mut self`, so whoever owns the value (the
//! control loop) is the single writer. Readers get cloned [`Snapshot`]s.

use corral_core::{
    CorralConfig, DuplicateProjectPolicy, Node, NodeSelection, Project, ServiceInstance, Snapshot,
    Status,
};
use corral_node::NodeTransport;
use corral_routing::RoutingConfig;
use corral_state::StateStore;
use tracing::{debug, info, warn};

use crate::cursor::RoundRobinCursor;
use crate::error::{OrchestratorError, OrchestratorResult};

/// Policy knobs for duplicate declarations and node eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub duplicate_projects: DuplicateProjectPolicy,
    pub node_selection: NodeSelection,
}

impl From<&CorralConfig> for OrchestratorConfig {
    fn from(config: &CorralConfig) -> Self {
        Self {
            duplicate_projects: config.duplicate_projects,
            node_selection: config.node_selection,
        }
    }
}

/// What one reconciliation tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Instances scheduled onto nodes.
    pub created: u32,
    /// Instances removed from the tracked set after a destroy.
    pub destroyed: u32,
    /// Instances that transitioned to UNHEALTHY during health sync.
    pub marked_unhealthy: u32,
}

impl TickReport {
    /// True when the tick neither created nor destroyed anything.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.destroyed == 0
    }
}

pub struct Orchestrator<T: NodeTransport> {
    state: Snapshot,
    cursor: RoundRobinCursor,
    transport: T,
    store: StateStore,
    config: OrchestratorConfig,
}

impl<T: NodeTransport> Orchestrator<T> {
    /// Empty state.
    pub fn new(transport: T, store: StateStore, config: OrchestratorConfig) -> Self {
        Self {
            state: Snapshot::default(),
            cursor: RoundRobinCursor::new(),
            transport,
            store,
            config,
        }
    }

    /// Rebuild an orchestrator from a persisted snapshot.
    ///
    /// Fails on malformed JSON and on snapshots whose instances reference
    /// nodes or projects that are not part of the snapshot.
    pub fn from_snapshot(
        bytes: &[u8],
        transport: T,
        store: StateStore,
        config: OrchestratorConfig,
    ) -> OrchestratorResult<Self> {
        let state = Snapshot::from_slice(bytes)?;
        info!(
            projects = state.projects.len(),
            nodes = state.nodes.len(),
            instances = state.project_services.values().map(Vec::len).sum::<usize>(),
            "recovered state"
        );
        Ok(Self {
            state,
            cursor: RoundRobinCursor::new(),
            transport,
            store,
            config,
        })
    }

    // ── Read views ─────────────────────────────────────────────────

    pub fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    /// Number of RUNNING instances of a project.
    pub fn count_healthy(&self, project: &str) -> OrchestratorResult<usize> {
        self.state
            .count_healthy(project)
            .ok_or_else(|| OrchestratorError::ProjectNotFound(project.to_string()))
    }

    /// Every tracked instance across all projects.
    pub fn list_services(&self) -> Vec<ServiceInstance> {
        self.state.list_services()
    }

    /// Routing configuration reflecting live reachability.
    ///
    /// Re-polls every instance's health first; the results are used for
    /// this projection only and never written back.
    pub async fn routing_config(&self) -> RoutingConfig {
        crate::routing::live_routing_config(&self.state, &self.transport).await
    }

    // ── Registration ───────────────────────────────────────────────

    /// Register a node. Nodes keep their registration order.
    pub fn add_node(&mut self, node: Node) -> OrchestratorResult<()> {
        if self.state.node(&node.id).is_some() {
            return Err(OrchestratorError::NodeExists(node.id));
        }
        info!(node = %node.id, address = %node.endpoint(), "registering node");
        self.state.nodes.push(node);
        Ok(())
    }

    /// Declare a project with an empty instance set.
    pub fn create_project(&mut self, project: Project) -> OrchestratorResult<()> {
        info!(name = %project.name, "creating project");

        if let Some(pos) = self.state.projects.iter().position(|p| p.name == project.name) {
            return match self.config.duplicate_projects {
                DuplicateProjectPolicy::Reject => {
                    Err(OrchestratorError::ProjectExists(project.name))
                }
                DuplicateProjectPolicy::Replace => {
                    warn!(name = %project.name, "replacing existing project declaration");
                    self.state.projects[pos] = project;
                    Ok(())
                }
            };
        }

        self.state
            .project_services
            .insert(project.name.clone(), Vec::new());
        self.state.projects.push(project);
        Ok(())
    }

    /// Destroy every tracked instance of a project.
    ///
    /// Stops at the first failed destroy; instances destroyed before it are
    /// dropped from the tracked set, the rest stay. The declaration is kept,
    /// so later ticks will schedule the project again.
    pub async fn destroy_project(&mut self, name: &str) -> OrchestratorResult<usize> {
        info!(%name, "destroying project");

        let Snapshot {
            project_services,
            nodes,
            ..
        } = &mut self.state;
        let instances = project_services
            .get_mut(name)
            .ok_or_else(|| OrchestratorError::ProjectNotFound(name.to_string()))?;

        let mut destroyed = 0;
        while let Some(inst) = instances.first() {
            let node = nodes
                .iter()
                .find(|n| n.id == inst.node)
                .ok_or_else(|| OrchestratorError::NodeNotFound(inst.node.clone()))?;
            info!(id = %inst.id, name = %inst.name, node = %node.id, "destroying service");
            self.transport.destroy(node, inst).await?;
            instances.remove(0);
            destroyed += 1;
        }

        Ok(destroyed)
    }

    // ── Node liveness ──────────────────────────────────────────────

    /// Probe every node and record whether it answered.
    ///
    /// Returns the number of healthy nodes.
    pub async fn run_healthcheck(&mut self) -> usize {
        let mut healthy = 0;
        for node in self.state.nodes.iter_mut() {
            match self.transport.probe(node).await {
                Ok(()) => {
                    if !node.healthy {
                        info!(node = %node.id, "node healthy");
                    }
                    node.healthy = true;
                    healthy += 1;
                }
                Err(e) => {
                    if node.healthy {
                        warn!(node = %node.id, address = %node.endpoint(), error = %e, "node not healthy");
                    } else {
                        debug!(node = %node.id, error = %e, "node still not healthy");
                    }
                    node.healthy = false;
                }
            }
        }
        healthy
    }

    // ── Reconciliation ─────────────────────────────────────────────

    /// One reconciliation tick: health sync, scale-up, garbage
    /// collection, persist.
    ///
    /// Health-sync failures never fail the tick. Scale-up, GC and persist
    /// failures are returned; whatever the tick already changed stays in
    /// memory and is persisted by the next successful tick.
    pub async fn update(&mut self) -> OrchestratorResult<TickReport> {
        let mut report = TickReport {
            marked_unhealthy: self.sync_health().await,
            ..Default::default()
        };

        report.created = self.scale_up().await?;
        report.destroyed = self.remove_stopped().await;
        report.destroyed += self.remove_unhealthy().await?;

        self.persist()?;

        debug!(
            created = report.created,
            destroyed = report.destroyed,
            unhealthy = report.marked_unhealthy,
            "reconciliation tick complete"
        );
        Ok(report)
    }

    /// Write the full snapshot to the store.
    pub fn persist(&self) -> OrchestratorResult<()> {
        self.store.put_snapshot(&self.state)?;
        Ok(())
    }

    /// Poll every tracked instance on its owning node.
    ///
    /// An unreachable node or a failed poll marks the instance UNHEALTHY.
    async fn sync_health(&mut self) -> u32 {
        let Snapshot {
            project_services,
            nodes,
            ..
        } = &mut self.state;

        let mut marked = 0;
        for instances in project_services.values_mut() {
            for inst in instances.iter_mut() {
                let previous = inst.status;
                let polled = match nodes.iter().find(|n| n.id == inst.node) {
                    Some(node) => self.transport.health(node, inst).await,
                    None => Err(corral_node::NodeError::Transport {
                        node: inst.node.clone(),
                        message: "node is not registered".to_string(),
                    }),
                };

                match polled {
                    Ok(mut polled) => {
                        polled.node = inst.node.clone();
                        *inst = polled;
                    }
                    Err(e) => {
                        warn!(id = %inst.id, node = %inst.node, error = %e, "could not update status of service");
                        inst.status = Status::Unhealthy;
                    }
                }

                if inst.status != previous {
                    info!(id = %inst.id, old_status = %previous, new_status = %inst.status, "service status changed");
                    if inst.status == Status::Unhealthy {
                        marked += 1;
                    }
                }
            }
        }
        marked
    }

    /// Schedule at most one new instance per under-replicated project.
    async fn scale_up(&mut self) -> OrchestratorResult<u32> {
        let mut created = 0;

        for idx in 0..self.state.projects.len() {
            let project = &self.state.projects[idx];
            let live = self
                .state
                .project_services
                .get(&project.name)
                .map(|instances| {
                    instances
                        .iter()
                        .filter(|i| i.status.counts_toward_replicas())
                        .count()
                })
                .unwrap_or(0);

            let desired = project.configuration.count;
            if live >= desired as usize {
                continue;
            }

            let name = project.name.clone();
            let spec = project.service_spec();
            let node = self.select_node()?;

            info!(project = %name, node = %node.id, live, desired, "creating service");
            let instance = self.transport.create(&node, &spec).await?;

            self.state
                .project_services
                .entry(name)
                .or_default()
                .push(instance);
            created += 1;
        }

        Ok(created)
    }

    /// Pick the next node in round-robin order.
    fn select_node(&mut self) -> OrchestratorResult<Node> {
        let candidates: Vec<&Node> = match self.config.node_selection {
            NodeSelection::AnyRegistered => self.state.nodes.iter().collect(),
            NodeSelection::HealthyOnly => self.state.nodes.iter().filter(|n| n.healthy).collect(),
        };

        let idx = self
            .cursor
            .next(candidates.len())
            .ok_or(OrchestratorError::NoSchedulableNodes)?;
        Ok(candidates[idx].clone())
    }

    /// Drop STOPPED instances, destroying them on a best-effort basis.
    async fn remove_stopped(&mut self) -> u32 {
        let Snapshot {
            project_services,
            nodes,
            ..
        } = &mut self.state;

        let mut removed = 0;
        for instances in project_services.values_mut() {
            let mut kept = Vec::with_capacity(instances.len());
            for inst in instances.drain(..) {
                if inst.status != Status::Stopped {
                    kept.push(inst);
                    continue;
                }

                if let Some(node) = nodes.iter().find(|n| n.id == inst.node) {
                    if let Err(e) = self.transport.destroy(node, &inst).await {
                        debug!(id = %inst.id, error = %e, "best-effort destroy of stopped service failed");
                    }
                }

                info!(id = %inst.id, name = %inst.name, "service stopped, removing service");
                removed += 1;
            }
            *instances = kept;
        }
        removed
    }

    /// Destroy and drop UNHEALTHY instances.
    ///
    /// The first failed destroy aborts the pass: that instance and every
    /// instance not yet visited stay tracked for the next tick.
    async fn remove_unhealthy(&mut self) -> OrchestratorResult<u32> {
        let Snapshot {
            project_services,
            nodes,
            ..
        } = &mut self.state;

        let mut removed = 0;
        for instances in project_services.values_mut() {
            let mut pending = std::mem::take(instances).into_iter();
            let mut kept = Vec::new();

            while let Some(inst) = pending.next() {
                if inst.status != Status::Unhealthy {
                    kept.push(inst);
                    continue;
                }

                let Some(node) = nodes.iter().find(|n| n.id == inst.node) else {
                    warn!(id = %inst.id, node = %inst.node, "unhealthy service on unknown node, dropping");
                    removed += 1;
                    continue;
                };

                info!(id = %inst.id, name = %inst.name, node = %node.id, "service unhealthy, removing service");
                if let Err(e) = self.transport.destroy(node, &inst).await {
                    kept.push(inst);
                    kept.extend(pending);
                    *instances = kept;
                    return Err(e.into());
                }
                removed += 1;
            }
            *instances = kept;
        }
        Ok(removed)
    }
}
