//! Docker-backed [`Provider`] on bollard.

use std::collections::HashMap;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, ContainerStateStatusEnum, HostConfig, PortBinding};
use tracing::{debug, info, warn};

use corral_core::{DockerService, ServiceInstance, ServiceSpec, Status};

use crate::error::{ProviderError, ProviderResult};
use crate::naming::container_name;
use crate::provider::Provider;

/// Seconds a container gets to exit before it is killed on destroy.
const STOP_GRACE_SECS: i64 = 10;

#[derive(Clone)]
pub struct DockerProvider {
    docker: Docker,
}

impl DockerProvider {
    /// Connect using the local defaults (`DOCKER_HOST` or the unix socket).
    pub fn connect() -> ProviderResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ProviderError::Connect(e.to_string()))?;
        Ok(Self { docker })
    }

    async fn inspect(&self, id: &str) -> Result<Option<ContainerInspectResponse>, DockerError> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(resp) => Ok(Some(resp)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_docker(&self, service: &DockerService) -> ProviderResult<ServiceInstance> {
        let name = container_name(&service.name);
        let port_key = port_key(service.container_port);
        let create_err = |e: DockerError| ProviderError::Create {
            service: service.name.clone(),
            message: e.to_string(),
        };

        let host_config = HostConfig {
            port_bindings: Some(HashMap::from([(
                port_key.clone(),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    // Empty host port: Docker picks a free one.
                    host_port: Some(String::new()),
                }]),
            )])),
            ..Default::default()
        };

        let config = Config {
            image: Some(service.docker_image.clone()),
            exposed_ports: Some(HashMap::from([(port_key, HashMap::new())])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(create_err)?;
        let id = response.id;

        let started = self.start_and_read_port(&id, service.container_port).await;
        let exposed_port = remove_on_error(&id, started, || self.force_remove(&id)).await?;

        info!(%name, %id, image = %service.docker_image, exposed_port, "created and started container");

        Ok(ServiceInstance {
            status: Status::Created,
            service: ServiceSpec::Docker(service.clone()),
            name,
            id,
            exposed_port,
            node: String::new(),
        })
    }

    async fn start_and_read_port(&self, id: &str, container_port: u16) -> ProviderResult<u16> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .map_err(|e| ProviderError::Start {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        let inspected = self
            .inspect(id)
            .await
            .map_err(|e| ProviderError::Inspect {
                id: id.to_string(),
                message: e.to_string(),
            })?;
        inspected
            .as_ref()
            .and_then(|resp| published_port(resp, container_port))
            .ok_or_else(|| ProviderError::NoPublishedPort {
                id: id.to_string(),
                container_port,
            })
    }

    async fn force_remove(&self, id: &str) -> Result<(), DockerError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
    }
}


impl Provider for DockerProvider {
    async fn create(&self, spec: &ServiceSpec) -> ProviderResult<ServiceInstance> {
        match spec {
            ServiceSpec::Docker(service) => self.create_docker(service).await,
        }
    }

    async fn health(&self, instance: &ServiceInstance) -> ProviderResult<ServiceInstance> {
        let inspected = self
            .inspect(&instance.id)
            .await
            .map_err(|e| ProviderError::Inspect {
                id: instance.id.clone(),
                message: e.to_string(),
            })?;

        let mut polled = instance.clone();
        polled.status = match inspected {
            Some(resp) => {
                let state = resp.state.as_ref().and_then(|s| s.status);
                map_status(instance.status, state)
            }
            None => {
                warn!(id = %instance.id, "container not found");
                Status::Stopped
            }
        };

        if polled.status != instance.status {
            info!(id = %instance.id, old_status = %instance.status, new_status = %polled.status, "service health updated");
        }
        Ok(polled)
    }

    async fn destroy(&self, instance: &ServiceInstance) -> ProviderResult<ServiceInstance> {
        let destroy_err = |e: DockerError| ProviderError::Destroy {
            id: instance.id.clone(),
            message: e.to_string(),
        };

        match self
            .docker
            .stop_container(&instance.id, Some(StopContainerOptions { t: STOP_GRACE_SECS }))
            .await
        {
            Ok(()) => {}
            Err(e) if is_not_found(&e) => {
                debug!(id = %instance.id, "container already gone");
                return Ok(stopped(instance));
            }
            // 304: already stopped.
            Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(destroy_err(e)),
        }

        match self.force_remove(&instance.id).await {
            Ok(()) => {}
            Err(e) if is_not_found(&e) => {}
            Err(e) => return Err(destroy_err(e)),
        }

        info!(id = %instance.id, name = %instance.name, "destroyed container");
        Ok(stopped(instance))
    }
}

/// A container that was created but never came up is removed again so it
/// does not outlive the failed create. A failed removal is logged and the
/// original error is returned either way.
async fn remove_on_error<T, F, Fut>(id: &str, result: ProviderResult<T>, remove: F) -> ProviderResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), DockerError>>,
{
    if let Err(e) = &result {
        match remove().await {
            Ok(()) => warn!(%id, error = %e, "removed container after failed start"),
            Err(remove_err) => {
                warn!(%id, error = %e, remove_error = %remove_err, "could not remove container after failed start")
            }
        }
    }
    result
}

fn stopped(instance: &ServiceInstance) -> ServiceInstance {
    let mut out = instance.clone();
    out.status = Status::Stopped;
    out
}

fn is_not_found(e: &DockerError) -> bool {
    matches!(
        e,
        DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn port_key(container_port: u16) -> String {
    format!("{container_port}/tcp")
}

/// Map Docker's container state onto an instance status.
///
/// `running` is RUNNING. A container still coming up (`created`,
/// `restarting`) keeps CREATED unless it had already been seen running, in
/// which case it is UNHEALTHY. Every other state is UNHEALTHY.
pub fn map_status(previous: Status, state: Option<ContainerStateStatusEnum>) -> Status {
    match state {
        Some(ContainerStateStatusEnum::RUNNING) => Status::Running,
        Some(ContainerStateStatusEnum::CREATED | ContainerStateStatusEnum::RESTARTING)
            if previous == Status::Created =>
        {
            Status::Created
        }
        _ => Status::Unhealthy,
    }
}

/// Host port Docker bound to `container_port`, if any.
pub fn published_port(resp: &ContainerInspectResponse, container_port: u16) -> Option<u16> {
    resp.network_settings
        .as_ref()?
        .ports
        .as_ref()?
        .get(&port_key(container_port))?
        .as_ref()?
        .iter()
        .filter_map(|binding| binding.host_port.as_deref())
        .find_map(|port| port.parse().ok())
}
