//! Node transport error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a single call to an agent.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The agent could not be reached (refused, reset, DNS, ...).
    #[error("transport error contacting node {node}: {message}")]
    Transport { node: String, message: String },

    #[error("request to node {node} timed out after {after:?}")]
    Timeout { node: String, after: Duration },

    /// The agent answered with a non-success status.
    #[error("node {node} returned {status}: {message}")]
    Provider {
        node: String,
        status: u16,
        message: String,
    },

    /// The request or response body was not valid JSON for its type.
    #[error("malformed payload for node {node}: {message}")]
    Serialization { node: String, message: String },
}

pub type NodeResult<T> = Result<T, NodeError>;
