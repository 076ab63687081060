//! Reverse-proxy configuration tree.
//!
//! Serializes to
//! `{"http": {"routers": {..}, "services": {name: {"loadBalancer": {"servers": [{"url"}]}}}}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingConfig {
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    pub routers: BTreeMap<String, RouterRule>,
    pub services: BTreeMap<String, BackendService>,
}

/// Host-match rule pointing at a backend service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouterRule {
    pub rule: String,
    pub service: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendService {
    #[serde(rename = "loadBalancer")]
    pub load_balancer: LoadBalancer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadBalancer {
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub url: String,
}

impl RoutingConfig {
    /// Backend URLs of a service, or `None` if it is not declared.
    pub fn servers_for(&self, service: &str) -> Option<Vec<&str>> {
        self.http.services.get(service).map(|svc| {
            svc.load_balancer
                .servers
                .iter()
                .map(|s| s.url.as_str())
                .collect()
        })
    }

    /// Total backend count across all services.
    pub fn backend_count(&self) -> usize {
        self.http
            .services
            .values()
            .map(|s| s.load_balancer.servers.len())
            .sum()
    }
}
