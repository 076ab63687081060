//! Startup: recover persisted state or bootstrap from descriptor files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use corral_core::{Node, Project};
use corral_node::NodeTransport;
use corral_state::StateStore;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};

/// Node and project declarations read from disk.
#[derive(Debug, Default)]
pub struct Descriptors {
    pub nodes: Vec<Node>,
    pub projects: Vec<Project>,
}

/// Read every `*.json` descriptor under the two directories, sorted by
/// file name. Nodes without an explicit id get `node-{i}` by position, or
/// the next free `node-{k}` when another descriptor already declares it.
///
/// A missing directory counts as empty; an unreadable or malformed file
/// is an error.
pub fn load_descriptors(nodes_dir: &Path, projects_dir: &Path) -> OrchestratorResult<Descriptors> {
    let mut nodes: Vec<Node> = read_dir_sorted(nodes_dir)?
        .iter()
        .map(|path| read_descriptor(path))
        .collect::<OrchestratorResult<_>>()?;

    assign_node_ids(&mut nodes);

    let projects = read_dir_sorted(projects_dir)?
        .iter()
        .map(|path| read_descriptor(path))
        .collect::<OrchestratorResult<_>>()?;

    Ok(Descriptors { nodes, projects })
}

fn assign_node_ids(nodes: &mut [Node]) {
    let mut taken: HashSet<String> = nodes
        .iter()
        .filter(|n| !n.id.is_empty())
        .map(|n| n.id.clone())
        .collect();

    for (i, node) in nodes.iter_mut().enumerate() {
        if !node.id.is_empty() {
            continue;
        }
        let mut k = i;
        while taken.contains(&format!("node-{k}")) {
            k += 1;
        }
        node.id = format!("node-{k}");
        taken.insert(node.id.clone());
    }
}

fn read_dir_sorted(dir: &Path) -> OrchestratorResult<Vec<PathBuf>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "descriptor directory does not exist");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| OrchestratorError::Descriptor {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OrchestratorError::Descriptor {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_descriptor<D: DeserializeOwned>(path: &Path) -> OrchestratorResult<D> {
    let bytes = std::fs::read(path).map_err(|e| OrchestratorError::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| OrchestratorError::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Build the controller's orchestrator.
///
/// A persisted snapshot wins; descriptor files are only read when the
/// store is empty. A fresh bootstrap probes every node once and persists
/// before returning.
pub async fn boot<T: NodeTransport>(
    transport: T,
    store: StateStore,
    config: OrchestratorConfig,
    nodes_dir: &Path,
    projects_dir: &Path,
) -> OrchestratorResult<Orchestrator<T>> {
    if let Some(bytes) = store.get_snapshot_bytes()? {
        info!("recovering state from store");
        return Orchestrator::from_snapshot(&bytes, transport, store, config);
    }

    info!(nodes = %nodes_dir.display(), projects = %projects_dir.display(), "bootstrapping from descriptors");
    let descriptors = load_descriptors(nodes_dir, projects_dir)?;

    let mut orch = Orchestrator::new(transport, store, config);
    for node in descriptors.nodes {
        orch.add_node(node)?;
    }
    let healthy = orch.run_healthcheck().await;
    info!(nodes = orch.nodes().len(), healthy, "nodes registered");

    for project in descriptors.projects {
        orch.create_project(project)?;
    }

    orch.persist()?;
    Ok(orch)
}
