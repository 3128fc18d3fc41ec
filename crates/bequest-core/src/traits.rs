//! Trait interfaces between crates:
//! - [`Clock`]: ledger time source (bequest-ledger injects one per ledger)
//! - [`Ledger`]: the async ledger collaborator the keeper and CLI talk to
//!   (bequest-ledger implements it locally and over JSON-RPC)

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::LedgerError;
use crate::instruction::{Receipt, SignedTransaction};
use crate::types::Address;

/// Source of ledger time in unix seconds.
pub trait Clock: Send + Sync {
    fn unix_timestamp(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self { now: AtomicI64::new(start) }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs` and return the new time.
    pub fn advance(&self, secs: i64) -> i64 {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// The ledger collaborator.
///
/// Every call may fail transiently (see [`LedgerError::is_transient`]).
/// `submit_and_confirm` either commits the whole instruction or nothing.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record bytes at `address`, `None` if the address holds no record.
    async fn read_account(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Native balance held at `address`.
    async fn native_balance(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Every record whose data starts with `discriminator`.
    async fn list_accounts(&self, discriminator: [u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, LedgerError>;

    /// Current ledger time in unix seconds.
    async fn unix_timestamp(&self) -> Result<i64, LedgerError>;

    /// Verify, execute and commit a transaction, returning once it is final.
    async fn submit_and_confirm(&self, tx: &SignedTransaction) -> Result<Receipt, LedgerError>;
}
