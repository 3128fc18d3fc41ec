use thiserror::Error;

use bequest_core::error::{CryptoError, LedgerError};

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("config: {0}")] Config(#[from] config::ConfigError),
    #[error("invalid keeper config: {0}")] InvalidConfig(String),
    #[error("keypair file {path}: {reason}")] KeyFile { path: String, reason: String },
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Ledger(#[from] LedgerError),
}
