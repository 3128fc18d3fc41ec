//! In-process ledger: signature checks, clock, and atomic instruction commits.
//!
//! Every transaction runs against a [`StagedStore`] overlay while the store's
//! write lock is held, and its writes are committed as one batch. Two
//! transactions touching the same account therefore serialize, and a failed
//! instruction leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use bequest_core::error::{LedgerError, StoreError};
use bequest_core::instruction::{Receipt, SignedTransaction};
use bequest_core::store::{AccountStore, StagedStore};
use bequest_core::traits::{Clock, Ledger};
use bequest_core::types::{Address, TxId};
use bequest_program::admin::{platform_analytics, PlatformAnalytics};
use bequest_program::process_transaction;

pub struct LocalLedger<S: AccountStore> {
    store: RwLock<S>,
    clock: Arc<dyn Clock>,
}

impl<S: AccountStore> LocalLedger<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store: RwLock::new(store), clock }
    }

    pub fn now(&self) -> i64 {
        self.clock.unix_timestamp()
    }

    /// Verify and execute `tx`, committing its writes atomically.
    pub fn execute(&self, tx: &SignedTransaction) -> Result<Receipt, LedgerError> {
        tx.verify()?;
        let txid = tx.txid();

        let mut store = self.store.write();
        if store.contains_transaction(&txid)? {
            return Err(LedgerError::DuplicateTransaction(txid.to_string()));
        }
        let now = self.clock.unix_timestamp();
        let mut staged = StagedStore::new(&*store);
        let transfers = match process_transaction(&mut staged, &tx.tx, now) {
            Ok(transfers) => transfers,
            Err(e) => {
                debug!(%txid, instruction = tx.tx.instruction.name(), error = %e, "rejected");
                return Err(LedgerError::Rejected(e));
            }
        };
        let writes = staged.into_writes();
        store.commit(writes, txid)?;
        debug!(%txid, instruction = tx.tx.instruction.name(), transfers = transfers.len(), "committed");
        Ok(Receipt { txid, timestamp: now, transfers })
    }

    /// Mint `amount` into `address`. Development and test networks only.
    pub fn airdrop(&self, address: &Address, amount: u64) -> Result<u64, LedgerError> {
        let mut store = self.store.write();
        let mut entry = store.get_entry(address)?.unwrap_or_default();
        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(address.to_string()))?;
        let balance = entry.balance;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"airdrop");
        hasher.update(address.as_bytes());
        hasher.update(&balance.to_le_bytes());
        let txid = TxId(*hasher.finalize().as_bytes());

        store.commit(vec![(*address, entry)], txid)?;
        info!(%address, amount, balance, "airdrop");
        Ok(balance)
    }

    pub fn analytics(&self) -> Result<PlatformAnalytics, LedgerError> {
        Ok(platform_analytics(&*self.store.read())?)
    }

    /// Run `f` with shared access to the underlying store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.store.read())
    }
}

#[async_trait]
impl<S: AccountStore + 'static> Ledger for LocalLedger<S> {
    async fn read_account(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.store.read().get_data(address)?)
    }

    async fn native_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        Ok(self.store.read().balance(address)?)
    }

    async fn list_accounts(&self, discriminator: [u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, LedgerError> {
        Ok(self.store.read().scan(&discriminator)?)
    }

    async fn unix_timestamp(&self) -> Result<i64, LedgerError> {
        Ok(self.now())
    }

    async fn submit_and_confirm(&self, tx: &SignedTransaction) -> Result<Receipt, LedgerError> {
        self.execute(tx)
    }
}
