//! Shared test helpers for scenario and integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bequest_core::accounts::{CustodialAccount, PlatformConfig, Record, Treasury};
use bequest_core::address::{custodial_address, platform_config_address, treasury_address};
use bequest_core::crypto::KeyPair;
use bequest_core::error::LedgerError;
use bequest_core::instruction::{AccountTarget, Instruction, Receipt, SignedTransaction, Transaction};
use bequest_core::store::{AccountStore, MemoryStore};
use bequest_core::traits::ManualClock;
use bequest_core::types::{Address, HeirShare, Identity, Percentage};
use bequest_keeper::{Keeper, KeeperConfig};
use bequest_ledger::LocalLedger;

/// Ledger time every world starts at.
pub const GENESIS: i64 = 1_700_000_000;

/// Deterministic keypair from a seed byte.
pub fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// An identity nobody holds a key for; fine for heirs.
pub fn identity(seed: u8) -> Identity {
    Identity([seed; 32])
}

pub fn share(seed: u8, pct: u8) -> HeirShare {
    HeirShare::new(identity(seed), Percentage::new(pct).unwrap())
}

/// An in-memory ledger with a manual clock and an initialized platform.
pub struct TestWorld {
    pub ledger: Arc<LocalLedger<MemoryStore>>,
    pub clock: Arc<ManualClock>,
    pub admin: KeyPair,
    nonce: AtomicU64,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(GENESIS));
        let ledger = Arc::new(LocalLedger::new(MemoryStore::new(), clock.clone()));
        let world = Self { ledger, clock, admin: keypair(1), nonce: AtomicU64::new(0) };
        world.submit(&world.admin, Instruction::Initialize).unwrap();
        world
    }

    pub fn sign(&self, kp: &KeyPair, ix: Instruction) -> SignedTransaction {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        Transaction::new(ix, kp.identity(), nonce).sign(kp).unwrap()
    }

    pub fn submit(&self, kp: &KeyPair, ix: Instruction) -> Result<Receipt, LedgerError> {
        self.ledger.execute(&self.sign(kp, ix))
    }

    pub fn now(&self) -> i64 {
        self.ledger.now()
    }

    pub fn advance(&self, secs: i64) -> i64 {
        self.clock.advance(secs)
    }

    pub fn fund(&self, who: &Identity, amount: u64) {
        self.ledger.airdrop(&who.wallet(), amount).unwrap();
    }

    /// Owner with a profile and `amount` in their wallet.
    pub fn owner(&self, seed: u8, premium: bool, amount: u64) -> KeyPair {
        let kp = keypair(seed);
        if amount > 0 {
            self.fund(&kp.identity(), amount);
        }
        self.submit(&kp, Instruction::CreateUserProfile { is_premium: premium }).unwrap();
        kp
    }

    /// Premium owner with a funded multi-heir account. Returns the owner and
    /// the account address.
    pub fn funded_account(&self, seed: u8, heirs: Vec<HeirShare>, period: i64, amount: u64) -> (KeyPair, Address) {
        let owner = self.owner(seed, true, amount);
        self.submit(
            &owner,
            Instruction::CreateCustodialAccount { heirs, inactivity_period_seconds: period },
        )
        .unwrap();
        if amount > 0 {
            self.submit(&owner, Instruction::Deposit { target: AccountTarget::Custodial, amount })
                .unwrap();
        }
        let address = custodial_address(&owner.identity());
        (owner, address)
    }

    pub fn wallet_balance(&self, who: &Identity) -> u64 {
        self.balance(&who.wallet())
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.ledger.with_store(|s| s.balance(address)).unwrap()
    }

    pub fn custodial(&self, address: &Address) -> CustodialAccount {
        let data = self.ledger.with_store(|s| s.get_data(address)).unwrap().unwrap();
        CustodialAccount::from_bytes(&data).unwrap()
    }

    pub fn vault_balance(&self, address: &Address) -> u64 {
        self.balance(&self.custodial(address).vault_address())
    }

    pub fn platform(&self) -> PlatformConfig {
        let data = self.ledger.with_store(|s| s.get_data(&platform_config_address())).unwrap().unwrap();
        PlatformConfig::from_bytes(&data).unwrap()
    }

    pub fn treasury(&self) -> Treasury {
        let data = self.ledger.with_store(|s| s.get_data(&treasury_address())).unwrap().unwrap();
        Treasury::from_bytes(&data).unwrap()
    }

    /// Sum of every native balance on the ledger.
    pub fn total_supply(&self) -> u128 {
        self.ledger.with_store(|s| s.total_balance())
    }

    /// Keeper over this world's ledger with fast retry settings.
    pub fn keeper(&self, seed: u8, config: KeeperConfig) -> Keeper<LocalLedger<MemoryStore>> {
        Keeper::new(self.ledger.clone(), keypair(seed), config).unwrap()
    }
}

/// Keeper settings for tests: no balance floor and millisecond backoff.
pub fn fast_keeper_config() -> KeeperConfig {
    KeeperConfig {
        min_balance: 0,
        backoff_base_ms: 1,
        backoff_max_ms: 8,
        attempt_timeout_ms: 2_000,
        ..KeeperConfig::default()
    }
}
