//! Bequest keeper daemon.
//!
//! Polls a bequest-node over JSON-RPC and executes the inheritance of every
//! owner whose inactivity period has elapsed. Any number of keepers may run
//! against the same node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use bequest_core::types::Identity;
use bequest_keeper::{load_keypair, Keeper, KeeperConfig};
use bequest_ledger::RpcLedger;

/// CLI arguments for the keeper. Each flag overrides the config file and
/// `KEEPER_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "bequest-keeper")]
#[command(version, about = "Bequest keeper: executes inheritances of inactive owners", long_about = None)]
struct Args {
    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// RPC server endpoint.
    #[arg(long)]
    rpc_url: Option<String>,

    /// File holding the keeper's hex secret key.
    #[arg(long)]
    wallet_path: Option<PathBuf>,

    /// Seconds between cycles.
    #[arg(long)]
    check_interval_secs: Option<u64>,

    /// Maximum concurrent executions.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Only watch these owners (comma-separated base58 identities).
    #[arg(long, value_delimiter = ',')]
    target_owners: Vec<Identity>,

    /// This keeper's shard, 0-based.
    #[arg(long)]
    shard_index: Option<u64>,

    /// Number of keepers splitting the key space.
    #[arg(long)]
    shard_count: Option<u64>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    fn apply(&self, mut config: KeeperConfig) -> KeeperConfig {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(path) = &self.wallet_path {
            config.wallet_path = Some(path.clone());
        }
        if let Some(secs) = self.check_interval_secs {
            config.check_interval_secs = secs;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if !self.target_owners.is_empty() {
            config.target_owners = self.target_owners.clone();
        }
        if let Some(index) = self.shard_index {
            config.shard_index = index;
        }
        if let Some(count) = self.shard_count {
            config.shard_count = count;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.apply(KeeperConfig::load(args.config.as_deref()).context("failed to load keeper config")?);
    config.validate().context("invalid keeper config")?;

    init_logging(&config.log_level, &args.log_format);

    info!("bequest-keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("RPC endpoint: {}", config.rpc_url);
    info!(
        "interval={}s batch_size={} shard={}/{} targets={}",
        config.check_interval_secs,
        config.batch_size,
        config.shard_index,
        config.shard_count,
        config.target_owners.len()
    );

    let wallet_path = config
        .wallet_path
        .clone()
        .context("no keeper key: pass --wallet-path or set KEEPER_WALLET_PATH")?;
    let keypair = load_keypair(&wallet_path).with_context(|| format!("failed to load key from {wallet_path:?}"))?;
    info!("keeper identity: {}", keypair.identity());

    let ledger = RpcLedger::connect(&config.rpc_url, config.attempt_timeout()).context("failed to create RPC client")?;
    let keeper = Keeper::new(Arc::new(ledger), keypair, config)?;

    if args.once {
        let report = keeper.run_once().await.context("keeper cycle failed")?;
        info!(%report, "cycle complete");
        return Ok(());
    }

    keeper
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
            warn!("received SIGINT, shutting down...");
        })
        .await;

    info!("keeper shutdown complete");
    Ok(())
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    }
}
