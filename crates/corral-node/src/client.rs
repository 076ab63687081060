//! HTTP transport to agents.
//!
//! Opens one HTTP/1 connection per call, sends a JSON body with the shared
//! secret in the `Token` header, and decodes the typed JSON response. The
//! whole exchange (connect, send, read body) is bounded by one timeout.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use corral_core::payload::*;
use corral_core::{Node, ServiceInstance, ServiceSpec};

use crate::error::{NodeError, NodeResult};
use crate::transport::NodeTransport;

/// Production [`NodeTransport`] speaking the agent's HTTP API.
#[derive(Clone)]
pub struct HttpTransport {
    secret: Arc<str>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(secret: &str, timeout: Duration) -> Self {
        Self {
            secret: Arc::from(secret),
            timeout,
        }
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    async fn call<B, R>(&self, node: &Node, path: &str, body: &B) -> NodeResult<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| NodeError::Serialization {
            node: node.id.clone(),
            message: e.to_string(),
        })?;

        let (status, bytes) = self
            .send(node, Method::POST, path, Bytes::from(payload))
            .await?;

        if !status.is_success() {
            return Err(NodeError::Provider {
                node: node.id.clone(),
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| NodeError::Serialization {
            node: node.id.clone(),
            message: e.to_string(),
        })
    }

    /// One request/response exchange with the node's agent.
    async fn send(
        &self,
        node: &Node,
        method: Method,
        path: &str,
        body: Bytes,
    ) -> NodeResult<(StatusCode, Bytes)> {
        let address = node.endpoint();
        let transport_err = |message: String| NodeError::Transport {
            node: node.id.clone(),
            message,
        };

        let exchange = async {
            let stream = tokio::net::TcpStream::connect(&address)
                .await
                .map_err(|e| transport_err(format!("connect {address}: {e}")))?;

            let io = hyper_util::rt::TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| transport_err(format!("handshake: {e}")))?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                let _ = conn.await;
            });

            let req = Request::builder()
                .method(method)
                .uri(path)
                .header(http::header::HOST, address.as_str())
                .header(http::header::CONTENT_TYPE, "application/json")
                .header(http::header::USER_AGENT, "corral-controller/0.1")
                .header(TOKEN_HEADER, self.secret.as_ref())
                .body(Full::new(body))
                .map_err(|e| transport_err(format!("build request: {e}")))?;

            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| transport_err(format!("send {path}: {e}")))?;

            let status = resp.status();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| transport_err(format!("read body: {e}")))?
                .to_bytes();

            Ok((status, bytes))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(node = %node.id, %path, "agent request timed out");
                Err(NodeError::Timeout {
                    node: node.id.clone(),
                    after: self.timeout,
                })
            }
        }
    }
}

impl NodeTransport for HttpTransport {
    async fn create(&self, node: &Node, spec: &ServiceSpec) -> NodeResult<ServiceInstance> {
        let request = CreateServiceRequest {
            service: spec.clone(),
        };
        let response: InstanceResponse = self.call(node, CREATE_PATH, &request).await?;
        let mut instance = response.state;
        instance.node = node.id.clone();
        Ok(instance)
    }

    async fn health(&self, node: &Node, instance: &ServiceInstance) -> NodeResult<ServiceInstance> {
        let request = InstanceRequest {
            service: instance.clone(),
        };
        let response: InstanceResponse = self.call(node, HEALTH_PATH, &request).await?;
        Ok(response.state)
    }

    async fn destroy(&self, node: &Node, instance: &ServiceInstance) -> NodeResult<ServiceInstance> {
        let request = InstanceRequest {
            service: instance.clone(),
        };
        let response: InstanceResponse = self.call(node, DESTROY_PATH, &request).await?;
        Ok(response.state)
    }

    async fn probe(&self, node: &Node) -> NodeResult<()> {
        let (status, _) = self.send(node, Method::GET, "/", Bytes::new()).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(NodeError::Provider {
                node: node.id.clone(),
                status: status.as_u16(),
                message: format!("liveness probe returned {status}"),
            })
        }
    }
}
