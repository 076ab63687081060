//! corral.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What `CreateProject` does when a project with the same name exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateProjectPolicy {
    /// Fail with `AlreadyExists`.
    #[default]
    Reject,
    /// Swap the declaration in place, keeping tracked instances.
    Replace,
}

/// Which nodes the scheduler may place new instances on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSelection {
    /// Every registered node, regardless of its health flag.
    #[default]
    #[serde(alias = "any")]
    AnyRegistered,
    /// Only nodes that passed the last liveness probe.
    #[serde(alias = "healthy")]
    HealthyOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorralConfig {
    /// Directory holding the controller's persisted state.
    pub home: PathBuf,
    pub agent_port: u16,
    /// Shared secret agents require in the `Token` header.
    pub secret: String,
    /// Public URL of the controller.
    pub controller_url: String,
    pub controller_port: u16,
    /// Node descriptors read at first boot.
    pub nodes_dir: PathBuf,
    /// Project descriptors read at first boot.
    pub projects_dir: PathBuf,
    pub tick_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub duplicate_projects: DuplicateProjectPolicy,
    pub node_selection: NodeSelection,
}

impl Default for CorralConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("corral/data"),
            agent_port: 6060,
            secret: "1oldmsmkp!".to_string(),
            controller_url: "localhost".to_string(),
            controller_port: 8060,
            nodes_dir: PathBuf::from("nodes"),
            projects_dir: PathBuf::from("projects"),
            tick_interval_secs: 5,
            request_timeout_secs: 10,
            duplicate_projects: DuplicateProjectPolicy::default(),
            node_selection: NodeSelection::default(),
        }
    }
}

impl CorralConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CorralConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.tick_interval_secs > 0, "tick_interval_secs must be at least 1");
        anyhow::ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be at least 1");
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the state database inside `home`.
    pub fn state_path(&self) -> PathBuf {
        self.home.join("corral.redb")
    }

    /// Pretty TOML with the secret masked, for startup logging.
    pub fn redacted(&self) -> String {
        let mut masked = self.clone();
        masked.secret = "********".to_string();
        toml::to_string_pretty(&masked).unwrap_or_default()
    }
}
