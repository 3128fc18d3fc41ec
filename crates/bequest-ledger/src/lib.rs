//! # bequest-ledger
//! Reference ledger: RocksDB storage, atomic execution and JSON-RPC.
//!
//! - [`storage::RocksStore`]: persistent account storage backed by RocksDB
//! - [`ledger::LocalLedger`]: signature checks, ledger clock and all-or-nothing commits
//! - [`rpc`]: JSON-RPC server for external access
//! - [`client::RpcLedger`]: the [`Ledger`](bequest_core::traits::Ledger) trait over JSON-RPC
//! - [`config::NodeConfig`]: node configuration

pub mod client;
pub mod config;
pub mod ledger;
pub mod rpc;
pub mod storage;

pub use client::RpcLedger;
pub use config::NodeConfig;
pub use ledger::LocalLedger;
pub use rpc::start_rpc_server;
pub use storage::RocksStore;
