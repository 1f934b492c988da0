//! Quorum daemon — entry point for running a validator node.

use anyhow::Context;
use clap::Parser;
use quorum_node::{NodeConfig, QuorumNode};
use quorum_types::Address;
use quorum_utils::{init_logging, LogFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum-daemon", about = "Quorum validator node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "QUORUM_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the validator registry.
    #[arg(long, env = "QUORUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QUORUM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QUORUM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Concurrent pulls allowed per vote hash.
    #[arg(long, env = "QUORUM_MAX_PARALLEL_PULLS")]
    max_parallel_pulls: Option<u32>,

    /// Outbound pull-request queue capacity.
    #[arg(long, env = "QUORUM_REQUEST_QUEUE_CAPACITY")]
    request_queue_capacity: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Validator registry operations.
    #[command(name = "validators")]
    Validators {
        #[command(subcommand)]
        action: ValidatorAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT.
    Run,
}

#[derive(clap::Subcommand)]
enum ValidatorAction {
    /// Register a validator address (hex, optional 0x prefix).
    Add { address: Address },
    /// Print the registry in canonical order.
    List,
}

impl Cli {
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path_str = path.to_string_lossy();
                NodeConfig::from_toml_file(&path_str)
                    .with_context(|| format!("loading config from {}", path.display()))?
            }
            None => NodeConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(pulls) = self.max_parallel_pulls {
            config.votes.max_parallel_pulls = pulls;
        }
        if let Some(capacity) = self.request_queue_capacity {
            config.gossip.request_queue_capacity = capacity;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run => {
                tracing::info!(
                    data_dir = %config.data_dir.display(),
                    required = ?config.gossip.required_categories,
                    "starting quorum node"
                );
                let mut node = QuorumNode::open(config)?;
                node.start()?;

                tokio::signal::ctrl_c()
                    .await
                    .context("waiting for shutdown signal")?;
                tracing::info!("shutdown signal received — stopping node");
                node.stop();
                tracing::info!("quorum daemon exited cleanly");
            }
        },
        Command::Validators { action } => {
            let node = QuorumNode::open(config)?;
            match action {
                ValidatorAction::Add { address } => {
                    if node.add_validator(address)? {
                        tracing::info!(%address, "validator registered");
                    } else {
                        tracing::info!(%address, "validator already registered");
                    }
                }
                ValidatorAction::List => {
                    for address in node.registry().validators().iter() {
                        println!("{address}");
                    }
                }
            }
        }
    }

    Ok(())
}
