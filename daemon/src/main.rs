//! Lock daemon: entry point for running a lock node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use instalock_node::{init_logging, LockNode, NodeConfig, NodeServices, TxAdmission};
use instalock_nullables::NullEnv;
use instalock_types::Transaction;

#[derive(Parser)]
#[command(name = "instalock-daemon", about = "Transaction lock node daemon")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "INSTALOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Disable transaction locking entirely.
    #[arg(long, env = "INSTALOCK_DISABLE")]
    disable_instantsend: bool,

    /// Command to run when a transaction locks (`%s` = txid).
    #[arg(long, env = "INSTALOCK_NOTIFY")]
    notify: Option<String>,

    /// Collect Prometheus metrics.
    #[arg(long, env = "INSTALOCK_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "INSTALOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "INSTALOCK_LOG_FORMAT")]
    log_format: Option<String>,

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
    /// Configuration helpers.
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run {
        /// Chain height of the standalone in-memory chain.
        #[arg(long, default_value_t = 0)]
        height: u32,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Parse the configuration and print the effective values.
    Check,
    /// Print the default configuration as TOML.
    Default,
}

/// Mempool stand-in for standalone runs: admits everything.
struct AdmitAll;

impl TxAdmission for AdmitAll {
    fn accept_to_mempool(&self, _tx: &Transaction) -> bool {
        true
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path)?
        }
        None => NodeConfig::default(),
    };
    Ok(NodeConfig {
        enable_instantsend: base.enable_instantsend && !cli.disable_instantsend,
        instantsend_notify: cli.notify.clone().or(base.instantsend_notify.clone()),
        enable_metrics: cli.metrics || base.enable_metrics,
        log_level: cli.log_level.clone().unwrap_or(base.log_level.clone()),
        log_format: cli.log_format.clone().unwrap_or(base.log_format.clone()),
        ..base
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Config { ref action } => {
            instalock_utils::init_tracing("info");
            match action {
                ConfigAction::Check => {
                    let config = load_config(&cli)?;
                    config.log_format()?;
                    config.local_voter()?;
                    tracing::info!("configuration is valid");
                    println!("{}", config.to_toml_string()?);
                }
                ConfigAction::Default => {
                    println!("{}", NodeConfig::default().to_toml_string()?);
                }
            }
        }
        Command::Node {
            action: NodeAction::Run { height },
        } => {
            let config = load_config(&cli)?;
            init_logging(config.log_format()?, &config.log_level)?;

            tracing::warn!(
                height,
                "no chain backend attached, running against an empty in-memory chain"
            );
            let env = NullEnv::new(height);
            let services = NodeServices {
                chain: env.chain.clone(),
                mempool: env.mempool.clone(),
                voters: env.voters.clone(),
                admission: Arc::new(AdmitAll),
            };

            let (mut node, mut outbound) = LockNode::new(config, services)?;
            let relay = tokio::spawn(async move {
                while let Some(msg) = outbound.recv().await {
                    tracing::debug!(
                        command = msg.kind.command(),
                        bytes = msg.payload.len(),
                        "outbound lock message"
                    );
                }
            });

            node.start();
            node.shutdown.wait_for_signal().await;
            node.stop().await;
            relay.abort();

            if let Some(text) = node.render_metrics()? {
                tracing::debug!(metrics = %text, "final metrics");
            }
            tracing::info!("daemon exited cleanly");
        }
    }

    Ok(())
}
