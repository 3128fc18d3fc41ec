//! The keeper loop.
//!
//! Each cycle reads the ledger clock, enumerates custodial records, keeps
//! those that are eligible for execution and submits `ExecuteInheritance`
//! for each, at most `batch_size` at a time. The keeper holds no state about
//! accounts between cycles: an account only leaves the work list once the
//! ledger reports it executed.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use bequest_core::accounts::{CustodialAccount, Record};
use bequest_core::crypto::KeyPair;
use bequest_core::error::{LedgerError, ProgramError};
use bequest_core::instruction::{Instruction, Receipt, SignedTransaction, Transaction};
use bequest_core::traits::Ledger;
use bequest_core::types::Address;
use bequest_program::decode_eligible;

use crate::config::KeeperConfig;
use crate::error::KeeperError;

/// An account found eligible during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub address: Address,
    pub account: CustodialAccount,
}

/// Result of trying to execute one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeeperOutcome {
    /// The inheritance was distributed by this keeper.
    Executed(Receipt),
    /// Someone else got there first. Counts as success.
    AlreadyExecuted,
    /// The owner became active again since discovery.
    NotYetInactive { inactive_at: i64 },
    PlatformPaused,
    /// The vault is empty; the account stays active.
    InsufficientBalance,
    /// An attempt timed out. Nothing is known about its effect; the
    /// account is examined again next cycle.
    Deferred,
    Failed { error: LedgerError, attempts: u32 },
}

impl KeeperOutcome {
    /// Whether the account is known to be executed after this outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, KeeperOutcome::Executed(_) | KeeperOutcome::AlreadyExecuted)
    }
}

/// Counters for one keeper cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Custodial records seen, before filtering.
    pub scanned: usize,
    pub eligible: usize,
    pub executed: usize,
    pub already_executed: usize,
    pub not_yet_inactive: usize,
    pub paused: usize,
    pub insufficient_balance: usize,
    pub deferred: usize,
    pub failed: usize,
    /// Sum of everything moved by executions in this cycle.
    pub distributed: u128,
    pub low_balance: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: &KeeperOutcome) {
        match outcome {
            KeeperOutcome::Executed(receipt) => {
                self.executed += 1;
                self.distributed += receipt.transfers.iter().map(|t| t.amount as u128).sum::<u128>();
            }
            KeeperOutcome::AlreadyExecuted => self.already_executed += 1,
            KeeperOutcome::NotYetInactive { .. } => self.not_yet_inactive += 1,
            KeeperOutcome::PlatformPaused => self.paused += 1,
            KeeperOutcome::InsufficientBalance => self.insufficient_balance += 1,
            KeeperOutcome::Deferred => self.deferred += 1,
            KeeperOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} eligible={} executed={} already_executed={} not_yet_inactive={} paused={} \
             insufficient_balance={} deferred={} failed={} distributed={}",
            self.scanned,
            self.eligible,
            self.executed,
            self.already_executed,
            self.not_yet_inactive,
            self.paused,
            self.insufficient_balance,
            self.deferred,
            self.failed,
            self.distributed
        )
    }
}

enum Attempt {
    Done(KeeperOutcome),
    Retry(LedgerError),
}

fn classify(err: LedgerError) -> Attempt {
    match err {
        LedgerError::Rejected(ProgramError::AlreadyExecuted) => Attempt::Done(KeeperOutcome::AlreadyExecuted),
        LedgerError::Rejected(ProgramError::NotYetInactive { inactive_at }) => {
            Attempt::Done(KeeperOutcome::NotYetInactive { inactive_at })
        }
        LedgerError::Rejected(ProgramError::PlatformPaused) => Attempt::Done(KeeperOutcome::PlatformPaused),
        LedgerError::Rejected(ProgramError::InsufficientBalance { .. }) => {
            Attempt::Done(KeeperOutcome::InsufficientBalance)
        }
        LedgerError::Timeout => Attempt::Done(KeeperOutcome::Deferred),
        e if e.is_transient() => Attempt::Retry(e),
        e => Attempt::Done(KeeperOutcome::Failed { error: e, attempts: 0 }),
    }
}

/// An unprivileged keeper. Cloning is cheap and clones share the nonce
/// counter.
pub struct Keeper<L: Ledger + ?Sized> {
    ledger: Arc<L>,
    keypair: Arc<KeyPair>,
    config: Arc<KeeperConfig>,
    nonce: Arc<AtomicU64>,
}

impl<L: Ledger + ?Sized> Clone for Keeper<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            keypair: Arc::clone(&self.keypair),
            config: Arc::clone(&self.config),
            nonce: Arc::clone(&self.nonce),
        }
    }
}

impl<L: Ledger + ?Sized + 'static> Keeper<L> {
    pub fn new(ledger: Arc<L>, keypair: KeyPair, config: KeeperConfig) -> Result<Self, KeeperError> {
        config.validate()?;
        Ok(Self {
            ledger,
            keypair: Arc::new(keypair),
            config: Arc::new(config),
            // Random start so a restarted keeper never re-signs an old message.
            nonce: Arc::new(AtomicU64::new(rand::random())),
        })
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Bound a ledger read by the per-attempt timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T, LedgerError>>) -> Result<T, LedgerError> {
        tokio::time::timeout(self.config.attempt_timeout(), call)
            .await
            .unwrap_or(Err(LedgerError::Timeout))
    }

    async fn discover(&self, now: i64) -> Result<(usize, Vec<Candidate>), LedgerError> {
        let records = self.bounded(self.ledger.list_accounts(CustodialAccount::DISCRIMINATOR)).await?;
        let scanned = records.len();
        let mut eligible = Vec::new();
        for (address, data) in records {
            if !self.config.owns_shard(&address) {
                continue;
            }
            match decode_eligible(&data, now) {
                Ok(Some(account)) if self.config.is_targeted(&account.owner) => {
                    eligible.push(Candidate { address, account });
                }
                Ok(_) => {}
                Err(e) => warn!(%address, error = %e, "skipping undecodable custodial record"),
            }
        }
        Ok((scanned, eligible))
    }

    /// Accounts in this keeper's scope that are eligible at `now`.
    pub async fn list_eligible_accounts(&self, now: i64) -> Result<Vec<Candidate>, LedgerError> {
        Ok(self.discover(now).await?.1)
    }

    fn sign_execute(&self, account: Address) -> Result<SignedTransaction, LedgerError> {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let tx = Transaction::new(Instruction::ExecuteInheritance { account }, self.keypair.identity(), nonce);
        Ok(tx.sign(&self.keypair)?)
    }

    /// Submit `ExecuteInheritance` for one account.
    ///
    /// Connectivity failures are retried up to `max_attempts` with
    /// exponential backoff. A timed-out attempt is not retried in place.
    pub async fn execute_inheritance(&self, account: Address) -> KeeperOutcome {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let tx = match self.sign_execute(account) {
                Ok(tx) => tx,
                Err(error) => return KeeperOutcome::Failed { error, attempts: attempt },
            };
            let result = self.bounded(self.ledger.submit_and_confirm(&tx)).await;
            let err = match result {
                Ok(receipt) => return KeeperOutcome::Executed(receipt),
                Err(e) => e,
            };
            match classify(err) {
                Attempt::Done(KeeperOutcome::Failed { error, .. }) => {
                    return KeeperOutcome::Failed { error, attempts: attempt };
                }
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(error) if attempt >= max_attempts => {
                    return KeeperOutcome::Failed { error, attempts: attempt };
                }
                Attempt::Retry(error) => {
                    let delay = self.config.backoff(attempt);
                    debug!(%account, attempt, ?delay, error = %error, "retrying execution");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn check_balance(&self) -> bool {
        let wallet = self.keypair.identity().wallet();
        match self.bounded(self.ledger.native_balance(&wallet)).await {
            Ok(balance) if balance < self.config.min_balance => {
                warn!(%wallet, balance, min = self.config.min_balance, "keeper balance below minimum");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(%wallet, error = %e, "could not read keeper balance");
                false
            }
        }
    }

    /// Run a single discovery and execution cycle.
    pub async fn run_once(&self) -> Result<CycleReport, LedgerError> {
        let now = self.bounded(self.ledger.unix_timestamp()).await?;
        let mut report = CycleReport { low_balance: self.check_balance().await, ..Default::default() };

        let (scanned, candidates) = self.discover(now).await?;
        report.scanned = scanned;
        report.eligible = candidates.len();
        if !candidates.is_empty() {
            info!(now, eligible = candidates.len(), scanned, "found eligible accounts");
        }

        for batch in candidates.chunks(self.config.batch_size) {
            let mut tasks = JoinSet::new();
            for candidate in batch {
                let keeper = self.clone();
                let address = candidate.address;
                tasks.spawn(async move { (address, keeper.execute_inheritance(address).await) });
            }
            while let Some(joined) = tasks.join_next().await {
                let (address, outcome) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        error!(error = %e, "execution task failed");
                        report.failed += 1;
                        continue;
                    }
                };
                log_outcome(&address, &outcome);
                report.record(&outcome);
            }
        }
        Ok(report)
    }

    /// Run cycles every `check_interval` until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.config.check_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("keeper shutting down");
                    return;
                }
                _ = interval.tick() => match self.run_once().await {
                    Ok(report) => info!(%report, "cycle complete"),
                    Err(e) => warn!(error = %e, "cycle aborted"),
                },
            }
        }
    }
}

fn log_outcome(address: &Address, outcome: &KeeperOutcome) {
    match outcome {
        KeeperOutcome::Executed(receipt) => {
            info!(%address, txid = %receipt.txid, transfers = receipt.transfers.len(), "inheritance executed")
        }
        KeeperOutcome::AlreadyExecuted => info!(%address, "already executed"),
        KeeperOutcome::NotYetInactive { inactive_at } => info!(%address, inactive_at, "owner active again"),
        KeeperOutcome::PlatformPaused => warn!(%address, "platform paused"),
        KeeperOutcome::InsufficientBalance => info!(%address, "vault empty"),
        KeeperOutcome::Deferred => warn!(%address, "attempt timed out; deferred to next cycle"),
        KeeperOutcome::Failed { error, attempts } => error!(%address, attempts, error = %error, "execution failed"),
    }
}
