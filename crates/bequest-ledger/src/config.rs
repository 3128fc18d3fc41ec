//! Ledger node configuration.
//!
//! Provides [`NodeConfig`] with defaults for the data directory, RPC binding
//! and log level.

use std::path::PathBuf;

use bequest_core::constants::DEFAULT_RPC_PORT;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "bequest_ledger=debug").
    pub log_level: String,
    /// Expose the `airdrop` method. Never enable on a network holding real value.
    pub enable_airdrop: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bequest");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            enable_airdrop: false,
        }
    }
}

impl NodeConfig {
    /// Path to the RocksDB account database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("accounts")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }
}
