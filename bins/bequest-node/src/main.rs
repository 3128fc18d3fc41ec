//! Bequest reference ledger node.
//!
//! Hosts a RocksDB-backed ledger behind the JSON-RPC server. Owners, admins
//! and keepers all talk to it through `bequest-cli` and `bequest-keeper`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use bequest_core::traits::SystemClock;
use bequest_ledger::{start_rpc_server, LocalLedger, NodeConfig, RocksStore};
use clap::Parser;
use tracing::{error, info, warn};

/// Bequest ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "bequest-node",
    version,
    about = "Bequest reference ledger with RocksDB storage and JSON-RPC server"
)]
struct Args {
    /// Data directory for the account database
    #[arg(long, default_value = None)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address
    #[arg(long, default_value = "127.0.0.1")]
    rpc_bind: String,

    /// RPC server port
    #[arg(long, default_value_t = bequest_core::constants::DEFAULT_RPC_PORT)]
    rpc_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Expose the `airdrop` RPC method. Development networks only.
    #[arg(long)]
    enable_airdrop: bool,
}

impl Args {
    fn into_config(self) -> (NodeConfig, String) {
        let defaults = NodeConfig::default();
        let config = NodeConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            rpc_bind: self.rpc_bind,
            rpc_port: self.rpc_port,
            log_level: self.log_level,
            enable_airdrop: self.enable_airdrop,
        };
        (config, self.log_format)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (config, log_format) = args.into_config();

    init_logging(&config.log_level, &log_format);

    info!("Bequest node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());
    if config.enable_airdrop {
        warn!("airdrop enabled; never run this node with real value");
    }

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("failed to create data_dir: {}", e);
        process::exit(1);
    }

    let store = match RocksStore::open(config.db_path()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to open account database: {}", e);
            process::exit(1);
        }
    };
    match store.transaction_count() {
        Ok(count) => info!("account database opened, {} transactions committed", count),
        Err(e) => warn!("could not read transaction count: {}", e),
    }

    let ledger = Arc::new(LocalLedger::new(store, Arc::new(SystemClock)));

    let rpc_handle = match start_rpc_server(&config.rpc_addr(), ledger, config.enable_airdrop).await {
        Ok((addr, handle)) => {
            info!("RPC server listening on {}", addr);
            handle
        }
        Err(e) => {
            error!("failed to start RPC server: {}", e);
            process::exit(1);
        }
    };

    info!("Bequest node running (Ctrl+C to stop)");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("failed to listen for Ctrl+C: {}", e);
            }
            info!("shutdown signal received");
        }
        _ = rpc_handle.clone().stopped() => {
            warn!("RPC server exited");
        }
    }

    rpc_handle.stop().ok();
    info!("RPC server stopped");
    info!("Bequest node shutdown complete");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
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
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
