//! corrald: the Corral daemon.
//!
//! One binary, two roles:
//! - `controller`: holds desired state, reconciles it against the agents
//!   every tick, and serves the read API plus the routing configuration.
//! - `agent`: runs on every worker node and drives the local container
//!   runtime on the controller's behalf.
//!
//! # Usage
//!
//! ```text
//! corrald controller --config corral.toml
//! corrald agent --agent-port 6060 --secret "$CORRAL_SECRET"
//! ```

mod agent_mode;
mod config;
mod controller_mode;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "corrald", about = "Corral container orchestrator daemon", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "CORRAL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller: reconciliation loop and read API.
    Controller,
    /// Run an agent on a worker node.
    Agent,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = config::load(cli.config.as_deref(), &cli.overrides)?;
    tracing::debug!(config = %config.redacted(), "effective configuration");

    match cli.command {
        Command::Controller => controller_mode::run_controller(config).await,
        Command::Agent => agent_mode::run_agent(config).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,corrald=debug,corral=debug"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
