//! Per-instruction execution context: typed record access and native transfers.

use bequest_core::accounts::{PlatformConfig, Record};
use bequest_core::address::platform_config_address;
use bequest_core::error::{ProgramError, StoreError};
use bequest_core::instruction::Transfer;
use bequest_core::store::AccountStore;
use bequest_core::types::{Address, Identity};

/// Everything a handler may touch while executing one instruction.
///
/// `store` is expected to be a staging overlay; handlers may fail after
/// writing, and the caller discards the overlay in that case.
pub struct InstructionContext<'a, S: AccountStore + ?Sized> {
    store: &'a mut S,
    pub signer: Identity,
    pub now: i64,
    transfers: Vec<Transfer>,
}

impl<'a, S: AccountStore + ?Sized> InstructionContext<'a, S> {
    pub fn new(store: &'a mut S, signer: Identity, now: i64) -> Self {
        Self { store, signer, now, transfers: Vec::new() }
    }

    pub fn into_transfers(self) -> Vec<Transfer> {
        self.transfers
    }

    pub fn load<T: Record>(&self, address: &Address) -> Result<Option<T>, ProgramError> {
        match self.store.get_data(address)? {
            Some(bytes) => Ok(Some(T::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn require<T: Record>(&self, address: &Address) -> Result<T, ProgramError> {
        self.load(address)?
            .ok_or_else(|| ProgramError::AccountNotFound(address.to_string()))
    }

    /// Overwrite the record at `address`, keeping its native balance.
    pub fn save<T: Record>(&mut self, address: &Address, record: &T) -> Result<(), ProgramError> {
        let mut entry = self.store.get_entry(address)?.unwrap_or_default();
        entry.data = record.to_bytes()?;
        self.store.put_entry(*address, entry)?;
        Ok(())
    }

    /// Write a new record, failing if one already exists at `address`.
    pub fn create<T: Record>(&mut self, address: &Address, record: &T) -> Result<(), ProgramError> {
        if self.store.get_data(address)?.is_some() {
            return Err(ProgramError::AlreadyExists(address.to_string()));
        }
        self.save(address, record)
    }

    pub fn platform(&self) -> Result<PlatformConfig, ProgramError> {
        self.load(&platform_config_address())?.ok_or(ProgramError::NotInitialized)
    }

    pub fn save_platform(&mut self, config: &PlatformConfig) -> Result<(), ProgramError> {
        self.save(&platform_config_address(), config)
    }

    pub fn balance(&self, address: &Address) -> Result<u64, ProgramError> {
        Ok(self.store.balance(address)?)
    }

    /// Move native balance. Zero amounts are a no-op and leave no transfer record.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), ProgramError> {
        if amount == 0 {
            return Ok(());
        }
        let mut source = self.store.get_entry(from)?.unwrap_or_default();
        if source.balance < amount {
            return Err(ProgramError::InsufficientFunds { have: source.balance, need: amount });
        }
        source.balance -= amount;
        self.store.put_entry(*from, source)?;

        let mut dest = self.store.get_entry(to)?.unwrap_or_default();
        dest.balance = dest
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(to.to_string()))?;
        self.store.put_entry(*to, dest)?;

        self.transfers.push(Transfer { from: *from, to: *to, amount });
        Ok(())
    }
}
