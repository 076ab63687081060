//! The full controller state: declared projects, tracked instances, nodes.
//!
//! A `Snapshot` is both the persisted document and the immutable view
//! published to the read-only API after every reconciliation tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Node, Project, ServiceInstance};

/// Errors raised while decoding a persisted snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("instance {instance} references unknown node {node}")]
    DanglingNode { instance: String, node: String },

    #[error("instances tracked for undeclared project {0}")]
    UndeclaredProject(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Declared projects in registration order.
    pub projects: Vec<Project>,
    /// Tracked instances keyed by project name.
    pub project_services: BTreeMap<String, Vec<ServiceInstance>>,
    /// Registered nodes in registration order.
    pub nodes: Vec<Node>,
}

impl Snapshot {
    /// Decode and validate a persisted snapshot.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        for (project, instances) in &self.project_services {
            if self.project(project).is_none() {
                return Err(SnapshotError::UndeclaredProject(project.clone()));
            }
            for inst in instances {
                if self.node(&inst.node).is_none() {
                    return Err(SnapshotError::DanglingNode {
                        instance: inst.id.clone(),
                        node: inst.node.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Number of RUNNING instances, or `None` if the project is unknown.
    pub fn count_healthy(&self, project: &str) -> Option<usize> {
        self.project_services.get(project).map(|instances| {
            instances
                .iter()
                .filter(|i| i.status.is_routable())
                .count()
        })
    }

    /// Every tracked instance across all projects.
    pub fn list_services(&self) -> Vec<ServiceInstance> {
        self.project_services.values().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            address: "10.0.0.1".to_string(),
            api_port: 6060,
            labels: vec!["ssd".to_string()],
            healthy: true,
        }
    }

    fn project(name: &str) -> Project {
        Project {
            name: name.to_string(),
            configuration: ProjectConfiguration {
                image: "nginx".to_string(),
                count: 2,
                container_port: 80,
                host: format!("{name}.example.com"),
            },
        }
    }

    fn instance(project: &Project, id: &str, node: &str, status: Status) -> ServiceInstance {
        ServiceInstance {
            status,
            service: project.service_spec(),
            name: format!("{}-{id}", project.name),
            id: id.to_string(),
            exposed_port: 4000,
            node: node.to_string(),
        }
    }

    fn populated() -> Snapshot {
        let web = project("web");
        let mut snapshot = Snapshot {
            projects: vec![web.clone(), project("api")],
            nodes: vec![node("node-0"), node("node-1")],
            ..Default::default()
        };
        snapshot.project_services.insert(
            "web".to_string(),
            vec![
                instance(&web, "a", "node-0", Status::Running),
                instance(&web, "b", "node-1", Status::Created),
                instance(&web, "c", "node-1", Status::Unhealthy),
            ],
        );
        snapshot.project_services.insert("api".to_string(), Vec::new());
        snapshot
    }

    #[test]
    fn round_trip_is_lossless() {
        let snapshot = populated();
        let bytes = snapshot.to_vec().unwrap();
        let decoded = Snapshot::from_slice(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        let err = Snapshot::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed(_)));
    }

    #[test]
    fn dangling_node_is_rejected() {
        let mut snapshot = populated();
        snapshot.nodes.pop();
        let bytes = snapshot.to_vec().unwrap();
        let err = Snapshot::from_slice(&bytes).unwrap_err();
        assert!(matches!(err, SnapshotError::DanglingNode { node, .. } if node == "node-1"));
    }

    #[test]
    fn instances_for_undeclared_project_are_rejected() {
        let mut snapshot = populated();
        snapshot.projects.retain(|p| p.name != "api");
        let bytes = snapshot.to_vec().unwrap();
        assert!(matches!(
            Snapshot::from_slice(&bytes),
            Err(SnapshotError::UndeclaredProject(p)) if p == "api"
        ));
    }

    #[test]
    fn count_healthy_counts_only_running() {
        let snapshot = populated();
        assert_eq!(snapshot.count_healthy("web"), Some(1));
        assert_eq!(snapshot.count_healthy("api"), Some(0));
        assert_eq!(snapshot.count_healthy("missing"), None);
    }

    #[test]
    fn list_services_flattens_projects() {
        let services = populated().list_services();
        assert_eq!(services.len(), 3);
        assert!(services.iter().all(|s| s.service.name() == "web"));
    }
}
