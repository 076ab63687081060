//! corral-node: the controller's view of one remote agent.
//!
//! Every orchestrator-level operation on a node (create, poll health,
//! destroy, liveness probe) becomes one request/response exchange with the
//! agent running on that node. The transport is stateless: it is keyed by
//! the `Node` passed to each call and holds only the shared secret and the
//! per-call timeout.
//!
//! # Architecture
//!
//! ```text
//! NodeTransport (trait)
//!   ├── HttpTransport   hyper HTTP/1 client, one connection per call
//!   └── SimulatedFleet  in-process fake (feature "sim")
//! ```
//!
//! No call is retried. Refused connections, timeouts, non-2xx responses
//! and malformed bodies all surface as a [`NodeError`]; the caller decides
//! what that means for the instance's status.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod transport;

pub use client::HttpTransport;
pub use error::{NodeError, NodeResult};
#[cfg(any(test, feature = "sim"))]
pub use sim::{FleetCall, SimulatedFleet};
pub use transport::NodeTransport;
