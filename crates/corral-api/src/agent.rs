//! Agent API: the controller's window onto one host's containers.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tracing::{debug, error, warn};

use corral_core::payload::*;
use corral_provider::{Provider, ProviderError};

use crate::AGENT_NAME;

/// Shared state for agent handlers.
pub struct AgentState<P> {
    pub provider: Arc<P>,
}

impl<P> Clone for AgentState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

/// Every route, including `GET /`, sits behind the token check.
pub fn agent_router<P: Provider>(provider: P, secret: &str) -> Router {
    let state = AgentState {
        provider: Arc::new(provider),
    };
    let secret: Arc<str> = Arc::from(secret);

    Router::new()
        .route("/", get(index))
        .route(CREATE_PATH, post(create_service::<P>))
        .route(HEALTH_PATH, post(service_health::<P>))
        .route(DESTROY_PATH, post(destroy_service::<P>))
        .layer(middleware::from_fn_with_state(secret, require_token))
        .with_state(state)
}

async fn require_token(State(secret): State<Arc<str>>, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if presented != Some(secret.as_ref()) {
        warn!(path = %req.uri().path(), "rejected request with missing or wrong token");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(req).await
}

fn bad_request(rejection: JsonRejection) -> Response {
    debug!(error = %rejection, "malformed request body");
    (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
}

fn provider_failure(e: ProviderError) -> Response {
    error!(error = %e, "provider call failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

/// GET /
async fn index() -> Json<ApiInfo> {
    Json(ApiInfo::new(AGENT_NAME))
}

/// POST /service
async fn create_service<P: Provider>(
    State(state): State<AgentState<P>>,
    body: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    match state.provider.create(&req.service).await {
        Ok(instance) => Json(InstanceResponse { state: instance }).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /service/health
async fn service_health<P: Provider>(
    State(state): State<AgentState<P>>,
    body: Result<Json<InstanceRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    match state.provider.health(&req.service).await {
        Ok(instance) => Json(InstanceResponse { state: instance }).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /service/destroy
async fn destroy_service<P: Provider>(
    State(state): State<AgentState<P>>,
    body: Result<Json<InstanceRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    match state.provider.destroy(&req.service).await {
        Ok(instance) => Json(InstanceResponse { state: instance }).into_response(),
        Err(e) => provider_failure(e),
    }
}
