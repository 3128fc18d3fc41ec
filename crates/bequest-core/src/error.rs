//! Error types for the Bequest engine.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record encoding and value-construction failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountError {
    #[error("invalid discriminator: expected {expected}, got {got}")] InvalidDiscriminator { expected: String, got: String },
    #[error("record too short: {0} bytes")] TooShort(usize),
    #[error("trailing bytes after record: {0}")] TrailingBytes(usize),
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("invalid base58 key: {0}")] InvalidKey(String),
    #[error("invalid percentage: {0} (must be 1..=100)")] InvalidPercentage(u8),
    #[error("invalid fee: {bps} bps > {max}")] InvalidFeeBps { bps: u16, max: u16 },
}

/// Failures reported by an [`AccountStore`](crate::store::AccountStore) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("storage backend: {0}")] Backend(String),
    #[error("corrupted entry at {address}: {reason}")] Corrupted { address: String, reason: String },
    #[error("balance overflow at {0}")] BalanceOverflow(String),
}

/// Instruction-level failures. Every variant is detected before any write
/// is committed; the ledger discards the staged writes of a failed instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramError {
    // Execution preconditions
    #[error("owner still active; inactive from {inactive_at}")] NotYetInactive { inactive_at: i64 },
    #[error("inheritance already executed")] AlreadyExecuted,
    #[error("platform is paused")] PlatformPaused,
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("vault still holds {0} after distribution")] VaultNotEmptied(u64),

    // Authorization
    #[error("unauthorized admin")] UnauthorizedAdmin,
    #[error("signer is not the account owner")] Unauthorized,

    // Heir configuration and tier limits
    #[error("heir allocations sum to {0}, expected 100")] AllocationSumInvalid(u32),
    #[error("no heirs provided")] NoHeirsProvided,
    #[error("too many heirs: {count} > {max}")] TooManyHeirs { count: usize, max: usize },
    #[error("duplicate heir: {0}")] DuplicateHeir(String),
    #[error("owner cannot name themselves as heir")] OwnerAsHeir,
    #[error("heir {0} is an address of the account itself")] HeirIsAccountAddress(String),
    #[error("custom inactivity period {got}s needs premium; free tier uses {expected}s")] CustomInactivityNotAllowed { got: i64, expected: i64 },
    #[error("invalid inactivity period: {0}")] InvalidInactivityPeriod(i64),
    #[error("premium subscription required")] PremiumRequired,
    #[error("profile is already premium")] AlreadyPremium,
    #[error("operation not supported for {0} accounts")] WrongAccountKind(String),

    // Control plane
    #[error("platform fee too high: {bps} > {max}")] FeeTooHigh { bps: u16, max: u16 },
    #[error("insufficient treasury balance: have {have}, need {need}")] InsufficientTreasuryBalance { have: u64, need: u64 },
    #[error("platform not initialized")] NotInitialized,

    // Generic
    #[error("amount must be greater than zero")] ZeroAmount,
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("account already exists: {0}")] AlreadyExists(String),
    #[error("account not found: {0}")] AccountNotFound(String),
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Account(#[from] AccountError),
    #[error(transparent)] Store(#[from] StoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("serialization: {0}")] Serialization(String),
}

/// Failures surfaced by the ledger collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")] Rejected(#[from] ProgramError),
    #[error("invalid transaction: {0}")] InvalidTransaction(#[from] CryptoError),
    #[error("duplicate transaction: {0}")] DuplicateTransaction(String),
    #[error(transparent)] Store(#[from] StoreError),
    #[error("request timed out")] Timeout,
    #[error("ledger unavailable: {0}")] Unavailable(String),
    #[error("encoding: {0}")] Encoding(String),
}

impl LedgerError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rejections are deterministic outcomes of the current ledger state and
    /// are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Timeout | LedgerError::Unavailable(_))
    }

    /// The program error carried by a rejection, if any.
    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            LedgerError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum BequestError {
    #[error(transparent)] Program(#[from] ProgramError),
    #[error(transparent)] Account(#[from] AccountError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Ledger(#[from] LedgerError),
}
