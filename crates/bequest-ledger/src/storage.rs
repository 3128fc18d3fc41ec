//! RocksDB-backed persistent account storage.
//!
//! Implements [`AccountStore`] with column families for account entries,
//! committed transaction ids and metadata. Every commit is a single
//! [`WriteBatch`].

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};

use bequest_core::accounts::has_discriminator;
use bequest_core::error::StoreError;
use bequest_core::store::{AccountEntry, AccountStore};
use bequest_core::types::{Address, TxId};

// --- Column family names ---

const CF_ACCOUNTS: &str = "accounts";
const CF_TRANSACTIONS: &str = "transactions";
const CF_METADATA: &str = "metadata";

const ALL_CFS: &[&str] = &[CF_ACCOUNTS, CF_TRANSACTIONS, CF_METADATA];

// --- Metadata keys ---

const META_TX_COUNT: &[u8] = b"tx_count";

pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a database at `path`, creating missing column families.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors).map_err(backend)?;
        Ok(Self { db })
    }

    /// Number of transactions committed since the database was created.
    pub fn transaction_count(&self) -> Result<u64, StoreError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, META_TX_COUNT).map_err(backend)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Backend("invalid tx_count length".into()))?;
                Ok(u64::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("missing column family: {name}")))
    }

    fn encode_entry(entry: &AccountEntry) -> Result<Vec<u8>, StoreError> {
        bincode::encode_to_vec(entry, bincode::config::standard()).map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn decode_entry(address: &Address, bytes: &[u8]) -> Result<AccountEntry, StoreError> {
        let (entry, _): (AccountEntry, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| StoreError::Corrupted { address: address.to_string(), reason: e.to_string() })?;
        Ok(entry)
    }
}

fn backend(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl AccountStore for RocksStore {
    fn get_entry(&self, address: &Address) -> Result<Option<AccountEntry>, StoreError> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, address.as_bytes()).map_err(backend)? {
            Some(bytes) => Ok(Some(Self::decode_entry(address, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put_entry(&mut self, address: Address, entry: AccountEntry) -> Result<(), StoreError> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        self.db
            .put_cf(cf, address.as_bytes(), Self::encode_entry(&entry)?)
            .map_err(backend)
    }

    fn scan(&self, discriminator: &[u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let mut found = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item.map_err(backend)?;
            let arr: [u8; 32] = key
                .as_ref()
                .try_into()
                .map_err(|_| StoreError::Backend(format!("invalid account key length {}", key.len())))?;
            let address = Address(arr);
            let entry = Self::decode_entry(&address, &value)?;
            if has_discriminator(&entry.data, discriminator) {
                found.push((address, entry.data));
            }
        }
        Ok(found)
    }

    fn contains_transaction(&self, txid: &TxId) -> Result<bool, StoreError> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        Ok(self.db.get_cf(cf, txid.as_bytes()).map_err(backend)?.is_some())
    }

    fn commit(&mut self, writes: Vec<(Address, AccountEntry)>, txid: TxId) -> Result<(), StoreError> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_txs = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;

        let mut batch = WriteBatch::default();
        for (address, entry) in &writes {
            batch.put_cf(cf_accounts, address.as_bytes(), Self::encode_entry(entry)?);
        }
        batch.put_cf(cf_txs, txid.as_bytes(), []);
        let count = self.transaction_count()? + 1;
        batch.put_cf(cf_meta, META_TX_COUNT, count.to_le_bytes());

        self.db.write(batch).map_err(backend)?;
        tracing::debug!(%txid, writes = writes.len(), "committed batch");
        Ok(())
    }
}
