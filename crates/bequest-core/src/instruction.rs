//! Instructions, signed transactions and receipts.
//!
//! A [`Transaction`] wraps exactly one [`Instruction`] together with the
//! signer and a caller-chosen nonce. The signature covers the bincode
//! encoding of the whole transaction; the ledger verifies it before the
//! instruction runs.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::address::{custodial_address, single_heir_address};
use crate::crypto::{self, KeyPair};
use crate::error::CryptoError;
use crate::types::{Address, HeirShare, Identity, TxId};

/// Selects one of the signer's own custodial records.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum AccountTarget {
    /// The owner's multi-heir custodial account.
    Custodial,
    /// The owner's single-heir record for this heir.
    SingleHeir(Identity),
}

impl AccountTarget {
    pub fn address(&self, owner: &Identity) -> Address {
        match self {
            AccountTarget::Custodial => custodial_address(owner),
            AccountTarget::SingleHeir(heir) => single_heir_address(owner, heir),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Instruction {
    // Control plane (admin)
    Initialize,
    SetPlatformFee { bps: u16 },
    Pause,
    Resume,
    WithdrawTreasury { amount: u64 },
    TransferAdmin { new_admin: Identity },

    // Owner
    CreateUserProfile { is_premium: bool },
    UpgradeToPremium,
    CreateCustodialAccount { heirs: Vec<HeirShare>, inactivity_period_seconds: i64 },
    CreateSingleHeir { heir: Identity, amount: u64, inactivity_period_seconds: i64 },
    Deposit { target: AccountTarget, amount: u64 },
    Withdraw { target: AccountTarget, amount: u64 },
    Heartbeat { target: AccountTarget },
    UpdateInactivityPeriod { target: AccountTarget, seconds: i64 },
    UpdateHeirs { heirs: Vec<HeirShare> },

    // Keeper (any signer)
    ExecuteInheritance { account: Address },
}

impl Instruction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Initialize => "initialize",
            Instruction::SetPlatformFee { .. } => "set_platform_fee",
            Instruction::Pause => "pause",
            Instruction::Resume => "resume",
            Instruction::WithdrawTreasury { .. } => "withdraw_treasury",
            Instruction::TransferAdmin { .. } => "transfer_admin",
            Instruction::CreateUserProfile { .. } => "create_user_profile",
            Instruction::UpgradeToPremium => "upgrade_to_premium",
            Instruction::CreateCustodialAccount { .. } => "create_custodial_account",
            Instruction::CreateSingleHeir { .. } => "create_single_heir",
            Instruction::Deposit { .. } => "deposit",
            Instruction::Withdraw { .. } => "withdraw",
            Instruction::Heartbeat { .. } => "heartbeat",
            Instruction::UpdateInactivityPeriod { .. } => "update_inactivity_period",
            Instruction::UpdateHeirs { .. } => "update_heirs",
            Instruction::ExecuteInheritance { .. } => "execute_inheritance",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Transaction {
    pub instruction: Instruction,
    pub signer: Identity,
    /// Distinguishes otherwise identical transactions from the same signer.
    pub nonce: u64,
}

impl Transaction {
    pub fn new(instruction: Instruction, signer: Identity, nonce: u64) -> Self {
        Self { instruction, signer, nonce }
    }

    /// The canonical bytes covered by the signature.
    pub fn message_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CryptoError::Serialization(e.to_string()))
    }

    /// Sign with `keypair`. The keypair must belong to `self.signer`.
    pub fn sign(self, keypair: &KeyPair) -> Result<SignedTransaction, CryptoError> {
        let signature = keypair.sign(&self.message_bytes()?).to_vec();
        Ok(SignedTransaction { tx: self, signature })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct SignedTransaction {
    pub tx: Transaction,
    /// Ed25519 signature (64 bytes).
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    pub fn verify(&self) -> Result<(), CryptoError> {
        crypto::verify(&self.tx.signer, &self.tx.message_bytes()?, &self.signature)
    }

    pub fn txid(&self) -> TxId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.signature);
        TxId(*hasher.finalize().as_bytes())
    }

    /// Wire encoding used by `sendtransaction`.
    pub fn to_hex(&self) -> Result<String, CryptoError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(hex::encode(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        let (tx, read): (Self, usize) = bincode::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(CryptoError::Serialization(format!("{} trailing bytes", bytes.len() - read)));
        }
        Ok(tx)
    }
}

/// A native-balance movement performed by an instruction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
}

/// Confirmation of a committed transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub txid: TxId,
    /// Ledger time the instruction executed at.
    pub timestamp: i64,
    pub transfers: Vec<Transfer>,
}

impl Receipt {
    pub fn total_to(&self, to: &Address) -> u64 {
        self.transfers.iter().filter(|t| t.to == *to).map(|t| t.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percentage;

    fn sample(kp: &KeyPair) -> Transaction {
        Transaction::new(
            Instruction::CreateCustodialAccount {
                heirs: vec![HeirShare::new(Identity([9u8; 32]), Percentage::FULL)],
                inactivity_period_seconds: 60,
            },
            kp.identity(),
            7,
        )
    }

    #[test]
    fn zero_percent_heir_is_rejected_on_the_wire() {
        let cfg = bincode::config::standard();
        let ix = Instruction::UpdateHeirs { heirs: vec![HeirShare::new(Identity([9u8; 32]), Percentage::FULL)] };
        let mut bytes = bincode::encode_to_vec(&ix, cfg).unwrap();
        // The allocation is the last byte of an UpdateHeirs encoding.
        let last = bytes.len() - 1;
        assert_eq!(bytes[last], 100);
        bytes[last] = 0;
        assert!(bincode::decode_from_slice::<Instruction, _>(&bytes, cfg).is_err());
    }

    #[test]
    fn signed_transaction_verifies() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let signed = sample(&kp).sign(&kp).unwrap();
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn tampered_transaction_fails() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let mut signed = sample(&kp).sign(&kp).unwrap();
        signed.tx.nonce += 1;
        assert_eq!(signed.verify(), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn wrong_key_fails() {
        let owner = KeyPair::from_secret_bytes([1u8; 32]);
        let other = KeyPair::from_secret_bytes([2u8; 32]);
        let signed = sample(&owner).sign(&other).unwrap();
        assert_eq!(signed.verify(), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn hex_wire_roundtrip() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let signed = sample(&kp).sign(&kp).unwrap();
        let back = SignedTransaction::from_hex(&signed.to_hex().unwrap()).unwrap();
        assert_eq!(back, signed);
        assert_eq!(back.txid(), signed.txid());
        assert!(SignedTransaction::from_hex("zz").is_err());
    }

    #[test]
    fn nonce_changes_txid() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let a = Transaction::new(Instruction::Pause, kp.identity(), 1).sign(&kp).unwrap();
        let b = Transaction::new(Instruction::Pause, kp.identity(), 2).sign(&kp).unwrap();
        assert_ne!(a.txid(), b.txid());
    }

    #[test]
    fn target_addresses() {
        let owner = Identity([1u8; 32]);
        let heir = Identity([2u8; 32]);
        assert_eq!(AccountTarget::Custodial.address(&owner), custodial_address(&owner));
        assert_eq!(AccountTarget::SingleHeir(heir).address(&owner), single_heir_address(&owner, &heir));
    }
}
