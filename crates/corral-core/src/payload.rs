//! Request and response bodies of the agent API.

use serde::{Deserialize, Serialize};

use crate::types::{ServiceInstance, ServiceSpec};

/// Header carrying the shared secret on every agent request.
pub const TOKEN_HEADER: &str = "Token";

pub const CREATE_PATH: &str = "/service";
pub const HEALTH_PATH: &str = "/service/health";
pub const DESTROY_PATH: &str = "/service/destroy";

/// Body of `POST /service`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateServiceRequest {
    pub service: ServiceSpec,
}

/// Body of `POST /service/health` and `POST /service/destroy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRequest {
    pub service: ServiceInstance,
}

/// Response of every agent service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceResponse {
    pub state: ServiceInstance,
}

/// Response of `GET /` on both the controller and the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
}

impl ApiInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}
