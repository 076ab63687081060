//! corral-api: the two HTTP surfaces.
//!
//! # Controller routes (read-only)
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Name and version |
//! | GET | `/projects` | Declared projects with their RUNNING count |
//! | GET | `/services` | Every tracked instance |
//! | GET | `/nodes` | Registered nodes by id |
//! | GET | `/routing-config` | Reverse-proxy configuration, health re-checked |
//!
//! # Agent routes (require the `Token` header)
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Name and version |
//! | POST | `/service` | Create and start a container |
//! | POST | `/service/health` | Inspect a container |
//! | POST | `/service/destroy` | Stop and remove a container |

pub mod agent;
pub mod controller;

pub use agent::{AgentState, agent_router};
pub use controller::{ControllerState, controller_router};

/// Name reported by the controller's `GET /`.
pub const CONTROLLER_NAME: &str = "CORRAL";
/// Name reported by the agent's `GET /`.
pub const AGENT_NAME: &str = "CORRAL-AGENT";
