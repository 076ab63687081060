//! Orchestrator error types.

use std::path::PathBuf;

use thiserror::Error;

use corral_core::SnapshotError;
use corral_node::NodeError;
use corral_state::StateError;

/// Errors that can occur while reconciling or querying controller state.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("node already registered: {0}")]
    NodeExists(String),

    #[error("no schedulable nodes")]
    NoSchedulableNodes,

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("descriptor {path}: {message}")]
    Descriptor { path: PathBuf, message: String },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
