//! Configuration layering: TOML file, then environment, then flags.
//!
//! clap resolves each override from its flag or, failing that, its
//! environment variable; whatever is set wins over the file.

use std::path::{Path, PathBuf};

use clap::Args;

use corral_core::CorralConfig;

#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Data directory (state store lives here).
    #[arg(long, global = true, env = "CORRAL_HOME")]
    pub home: Option<PathBuf>,

    /// Port the agent listens on.
    #[arg(long, global = true, env = "CORRAL_AGENT_PORT")]
    pub agent_port: Option<u16>,

    /// Shared secret sent in the `Token` header.
    #[arg(long, global = true, env = "CORRAL_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Address agents use to reach the controller.
    #[arg(long, global = true, env = "CORRAL_CONTROLLER_URL")]
    pub controller_url: Option<String>,

    /// Port the controller's read API listens on.
    #[arg(long, global = true)]
    pub controller_port: Option<u16>,

    /// Directory of node descriptors (`*.json`).
    #[arg(long, global = true)]
    pub nodes_dir: Option<PathBuf>,

    /// Directory of project descriptors (`*.json`).
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Seconds between reconciliation ticks.
    #[arg(long, global = true)]
    pub tick_interval_secs: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut CorralConfig) {
        if let Some(home) = &self.home {
            config.home = home.clone();
        }
        if let Some(port) = self.agent_port {
            config.agent_port = port;
        }
        if let Some(secret) = &self.secret {
            config.secret = secret.clone();
        }
        if let Some(url) = &self.controller_url {
            config.controller_url = url.clone();
        }
        if let Some(port) = self.controller_port {
            config.controller_port = port;
        }
        if let Some(dir) = &self.nodes_dir {
            config.nodes_dir = dir.clone();
        }
        if let Some(dir) = &self.projects_dir {
            config.projects_dir = dir.clone();
        }
        if let Some(secs) = self.tick_interval_secs {
            config.tick_interval_secs = secs;
        }
    }
}

/// Defaults, overlaid by `path` when given, overlaid by `overrides`.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<CorralConfig> {
    let mut config = match path {
        Some(path) => CorralConfig::from_file(path)?,
        None => CorralConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
