//! Account storage interface, in-memory implementation and write staging.
//!
//! The program never writes to a backing store directly. Each instruction
//! runs against a [`StagedStore`] whose writes are handed to
//! [`AccountStore::commit`] in one batch only if the instruction succeeds.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::accounts::has_discriminator;
use crate::error::StoreError;
use crate::types::{Address, TxId};

/// The state held at one ledger address: record bytes (possibly empty) and a
/// native balance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default, Encode, Decode)]
pub struct AccountEntry {
    pub data: Vec<u8>,
    pub balance: u64,
}

/// Persistent account storage.
///
/// Implemented by [`MemoryStore`] for tests and by the RocksDB store in
/// `bequest-ledger`.
pub trait AccountStore: Send + Sync {
    /// Fetch the entry at `address`. `None` if nothing was ever written there.
    fn get_entry(&self, address: &Address) -> Result<Option<AccountEntry>, StoreError>;

    /// Write a single entry immediately.
    fn put_entry(&mut self, address: Address, entry: AccountEntry) -> Result<(), StoreError>;

    /// All entries whose record data begins with `discriminator`, ordered by address.
    fn scan(&self, discriminator: &[u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;

    /// Whether a transaction with this id has been committed.
    fn contains_transaction(&self, txid: &TxId) -> Result<bool, StoreError>;

    /// Apply `writes` and mark `txid` committed, all or nothing.
    fn commit(&mut self, writes: Vec<(Address, AccountEntry)>, txid: TxId) -> Result<(), StoreError>;

    /// Record bytes at `address`, `None` for missing or data-less entries.
    fn get_data(&self, address: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get_entry(address)?.map(|e| e.data).filter(|d| !d.is_empty()))
    }

    /// Native balance at `address`; 0 for unknown addresses.
    fn balance(&self, address: &Address) -> Result<u64, StoreError> {
        Ok(self.get_entry(address)?.map(|e| e.balance).unwrap_or(0))
    }
}

/// In-memory account store backed by a `BTreeMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<Address, AccountEntry>,
    committed: HashSet<TxId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every native balance in the store.
    pub fn total_balance(&self) -> u128 {
        self.entries.values().map(|e| u128::from(e.balance)).sum()
    }
}

impl AccountStore for MemoryStore {
    fn get_entry(&self, address: &Address) -> Result<Option<AccountEntry>, StoreError> {
        Ok(self.entries.get(address).cloned())
    }

    fn put_entry(&mut self, address: Address, entry: AccountEntry) -> Result<(), StoreError> {
        self.entries.insert(address, entry);
        Ok(())
    }

    fn scan(&self, discriminator: &[u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .entries
            .iter()
            .filter(|(_, e)| has_discriminator(&e.data, discriminator))
            .map(|(a, e)| (*a, e.data.clone()))
            .collect())
    }

    fn contains_transaction(&self, txid: &TxId) -> Result<bool, StoreError> {
        Ok(self.committed.contains(txid))
    }

    fn commit(&mut self, writes: Vec<(Address, AccountEntry)>, txid: TxId) -> Result<(), StoreError> {
        self.entries.extend(writes);
        self.committed.insert(txid);
        Ok(())
    }
}

/// Copy-on-write overlay over a base store.
///
/// Reads fall through to the base unless the address was written in this
/// overlay. Nothing reaches the base until the caller commits
/// [`into_writes`](Self::into_writes).
pub struct StagedStore<'a, S: AccountStore + ?Sized> {
    base: &'a S,
    writes: BTreeMap<Address, AccountEntry>,
}

impl<'a, S: AccountStore + ?Sized> StagedStore<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self { base, writes: BTreeMap::new() }
    }

    pub fn into_writes(self) -> Vec<(Address, AccountEntry)> {
        self.writes.into_iter().collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }
}

impl<S: AccountStore + ?Sized> AccountStore for StagedStore<'_, S> {
    fn get_entry(&self, address: &Address) -> Result<Option<AccountEntry>, StoreError> {
        match self.writes.get(address) {
            Some(entry) => Ok(Some(entry.clone())),
            None => self.base.get_entry(address),
        }
    }

    fn put_entry(&mut self, address: Address, entry: AccountEntry) -> Result<(), StoreError> {
        self.writes.insert(address, entry);
        Ok(())
    }

    fn scan(&self, discriminator: &[u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Address, Vec<u8>> = self.base.scan(discriminator)?.into_iter().collect();
        for (address, entry) in &self.writes {
            if has_discriminator(&entry.data, discriminator) {
                merged.insert(*address, entry.data.clone());
            } else {
                merged.remove(address);
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn contains_transaction(&self, txid: &TxId) -> Result<bool, StoreError> {
        self.base.contains_transaction(txid)
    }

    fn commit(&mut self, writes: Vec<(Address, AccountEntry)>, _txid: TxId) -> Result<(), StoreError> {
        self.writes.extend(writes);
        Ok(())
    }
}
