use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("container runtime unavailable: {0}")]
    Connect(String),

    #[error("create {service}: {message}")]
    Create { service: String, message: String },

    #[error("start {id}: {message}")]
    Start { id: String, message: String },

    #[error("inspect {id}: {message}")]
    Inspect { id: String, message: String },

    #[error("destroy {id}: {message}")]
    Destroy { id: String, message: String },

    #[error("container {id} publishes no host port for {container_port}/tcp")]
    NoPublishedPort { id: String, container_port: u16 },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
