pub mod config;
pub mod payload;
pub mod snapshot;
pub mod types;

pub use config::{CorralConfig, DuplicateProjectPolicy, NodeSelection};
pub use snapshot::{Snapshot, SnapshotError};
pub use types::*;

/// Version reported by the controller and agent `GET /` endpoints.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
