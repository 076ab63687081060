//! Corral orchestrator: desired vs. actual state, round-robin scheduling,
//! and the periodic reconciliation loop that drives agents toward it.

pub mod bootstrap;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod orchestrator;
pub mod routing;

pub use bootstrap::{Descriptors, boot, load_descriptors};
pub use controller::{Controller, StateView};
pub use cursor::RoundRobinCursor;
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{Orchestrator, OrchestratorConfig, TickReport};
pub use routing::live_routing_config;
