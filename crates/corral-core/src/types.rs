//! Domain types shared by the controller and the agents.
//!
//! These are passive definitions. The orchestrator owns every value of
//! these types held in memory; agents only ever see copies carried in
//! request and response payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node, assigned by the controller at bootstrap.
pub type NodeId = String;

// ── Status ────────────────────────────────────────────────────────

/// Lifecycle status of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Created on the agent, not yet confirmed running.
    Created,
    Running,
    Stopped,
    Unhealthy,
}

impl Status {
    /// Whether an instance in this status counts toward the declared
    /// replica count when deciding to scale up.
    pub fn counts_toward_replicas(self) -> bool {
        matches!(self, Status::Running | Status::Created)
    }

    /// Whether an instance in this status may receive routed traffic.
    pub fn is_routable(self) -> bool {
        self == Status::Running
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Created => "CREATED",
            Status::Running => "RUNNING",
            Status::Stopped => "STOPPED",
            Status::Unhealthy => "UNHEALTHY",
        };
        f.write_str(s)
    }
}

// ── Node ──────────────────────────────────────────────────────────

/// A worker node running an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    /// Assigned by the controller; descriptor files usually omit it.
    #[serde(default)]
    pub id: NodeId,
    pub address: String,
    pub api_port: u16,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Result of the last liveness probe.
    #[serde(default)]
    pub healthy: bool,
}

impl Node {
    /// `address:api_port` of the agent API.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.api_port)
    }
}

// ── Project ───────────────────────────────────────────────────────

/// A declared workload: what should run and how many copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub configuration: ProjectConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfiguration {
    pub image: String,
    /// Desired replica count.
    pub count: u32,
    pub container_port: u16,
    /// Public host name routed to this project.
    #[serde(default)]
    pub host: String,
}

impl Project {
    /// Service descriptor handed to an agent when scheduling a replica.
    pub fn service_spec(&self) -> ServiceSpec {
        ServiceSpec::Docker(DockerService {
            name: self.name.clone(),
            docker_image: self.configuration.image.clone(),
            desired_status: Status::Running,
            container_port: self.configuration.container_port,
        })
    }
}

// ── Service descriptor ────────────────────────────────────────────

/// What an agent should run. One variant per supported runtime backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceSpec {
    Docker(DockerService),
}

impl ServiceSpec {
    pub fn name(&self) -> &str {
        match self {
            ServiceSpec::Docker(svc) => &svc.name,
        }
    }
}

/// A container image exposing one port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DockerService {
    pub name: String,
    pub docker_image: String,
    pub desired_status: Status,
    pub container_port: u16,
}

// ── Instance ──────────────────────────────────────────────────────

/// One copy of a project's service on a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    pub status: Status,
    pub service: ServiceSpec,
    /// Display name, e.g. the container name.
    pub name: String,
    /// Runtime id on the owning agent.
    pub id: String,
    /// Host port the service is reachable on.
    pub exposed_port: u16,
    /// Owning node. Agents leave this empty; the controller stamps it.
    #[serde(default)]
    pub node: NodeId,
}
