//! corral-routing: derives a reverse-proxy configuration from controller
//! state.
//!
//! The output follows the schema of a file-based HTTP provider: one router
//! per project matching its public host, and one load-balanced service per
//! project listing every RUNNING instance as `http://node-address:port`.
//!
//! - **`config`**: the serializable configuration tree
//! - **`projection`**: the pure state → config transform

pub mod config;
pub mod projection;

pub use config::{BackendService, HttpConfig, LoadBalancer, RouterRule, RoutingConfig, Server};
pub use projection::project;
