//! Persisted account records.
//!
//! Each record is stored as an 8-byte discriminator followed by its bincode
//! (standard config) body. Decoding rejects foreign discriminators and
//! trailing bytes, so a record can never be misread as another type.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::address::{custodial_address, single_heir_address, vault_address};
use crate::constants::{DEFAULT_INACTIVITY_PERIOD_SECS, FREE_MAX_HEIRS, PREMIUM_MAX_HEIRS};
use crate::error::{AccountError, ProgramError};
use crate::types::{allocation_sum, Address, FeeBps, HeirShare, Identity};

/// Typed, discriminated binary encoding for account records.
pub trait Record: Encode + Decode<()> + Sized {
    const DISCRIMINATOR: [u8; 8];

    fn to_bytes(&self) -> Result<Vec<u8>, AccountError> {
        let mut out = Self::DISCRIMINATOR.to_vec();
        let body = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| AccountError::Encode(e.to_string()))?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, AccountError> {
        if bytes.len() < 8 {
            return Err(AccountError::TooShort(bytes.len()));
        }
        let (disc, body) = bytes.split_at(8);
        if disc != Self::DISCRIMINATOR {
            return Err(AccountError::InvalidDiscriminator {
                expected: hex::encode(Self::DISCRIMINATOR),
                got: hex::encode(disc),
            });
        }
        let (value, read): (Self, usize) =
            bincode::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| AccountError::Decode(e.to_string()))?;
        if read != body.len() {
            return Err(AccountError::TrailingBytes(body.len() - read));
        }
        Ok(value)
    }
}

/// Whether raw account data carries the given discriminator.
pub fn has_discriminator(data: &[u8], discriminator: &[u8; 8]) -> bool {
    data.len() >= 8 && &data[..8] == discriminator
}

/// Platform-wide configuration and statistics (singleton).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct PlatformConfig {
    pub admin: Identity,
    pub platform_fee_bps: FeeBps,
    pub is_paused: bool,
    /// Ledger time of the last pause; 0 while running.
    pub pause_timestamp: i64,
    pub total_users: u64,
    pub premium_users: u64,
    pub total_fees_collected: u64,
    pub total_inheritances_executed: u64,
    /// Sum of all vault balances distributed, fees included.
    pub total_inheritance_value: u64,
}

impl Record for PlatformConfig {
    const DISCRIMINATOR: [u8; 8] = *b"BQ/PCONF";
}

impl PlatformConfig {
    pub fn new(admin: Identity, platform_fee_bps: FeeBps) -> Self {
        Self {
            admin,
            platform_fee_bps,
            is_paused: false,
            pause_timestamp: 0,
            total_users: 0,
            premium_users: 0,
            total_fees_collected: 0,
            total_inheritances_executed: 0,
            total_inheritance_value: 0,
        }
    }

    pub fn average_inheritance_value(&self) -> u64 {
        self.total_inheritance_value
            .checked_div(self.total_inheritances_executed)
            .unwrap_or(0)
    }
}

/// Fee accumulator (singleton). `total_balance` mirrors the native balance
/// held at the treasury address.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Treasury {
    pub admin: Identity,
    pub total_balance: u64,
}

impl Record for Treasury {
    const DISCRIMINATOR: [u8; 8] = *b"BQ/TREAS";
}

/// Per-owner profile gating tier limits.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct UserProfile {
    pub user: Identity,
    pub is_premium: bool,
    pub total_inheritances_created: u64,
    pub total_fees_paid: u64,
    pub created_at: i64,
}

impl Record for UserProfile {
    const DISCRIMINATOR: [u8; 8] = *b"BQ/UPROF";
}

impl UserProfile {
    pub fn max_heirs(&self) -> usize {
        if self.is_premium { PREMIUM_MAX_HEIRS } else { FREE_MAX_HEIRS }
    }

    /// Check a requested inactivity period against this profile's tier.
    pub fn check_inactivity_period(&self, seconds: i64) -> Result<(), ProgramError> {
        if seconds <= 0 {
            return Err(ProgramError::InvalidInactivityPeriod(seconds));
        }
        if !self.is_premium && seconds != DEFAULT_INACTIVITY_PERIOD_SECS {
            return Err(ProgramError::CustomInactivityNotAllowed {
                got: seconds,
                expected: DEFAULT_INACTIVITY_PERIOD_SECS,
            });
        }
        Ok(())
    }

    /// Check heir-count limits for this profile's tier.
    pub fn check_heir_count(&self, count: usize) -> Result<(), ProgramError> {
        let max = self.max_heirs();
        if count > max {
            return Err(ProgramError::TooManyHeirs { count, max });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub enum AccountKind {
    /// One heir at 100%, one record per owner/heir pair.
    SingleHeir,
    /// Up to the tier limit of heirs, one record per owner.
    MultiHeirCustodial,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::SingleHeir => write!(f, "single-heir"),
            AccountKind::MultiHeirCustodial => write!(f, "multi-heir"),
        }
    }
}

/// A custodial account. Its balance lives natively at [`vault_address`](Self::vault_address).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct CustodialAccount {
    pub owner: Identity,
    pub kind: AccountKind,
    pub heirs: Vec<HeirShare>,
    pub inactivity_period_seconds: i64,
    pub last_active_timestamp: i64,
    pub is_executed: bool,
    pub created_at: i64,
    /// Ledger time of execution; 0 until executed.
    pub executed_at: i64,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
}

impl Record for CustodialAccount {
    const DISCRIMINATOR: [u8; 8] = *b"BQ/CUSTD";
}

impl CustodialAccount {
    pub fn new(
        owner: Identity,
        kind: AccountKind,
        heirs: Vec<HeirShare>,
        inactivity_period_seconds: i64,
        now: i64,
    ) -> Self {
        Self {
            owner,
            kind,
            heirs,
            inactivity_period_seconds,
            last_active_timestamp: now,
            is_executed: false,
            created_at: now,
            executed_at: 0,
            total_deposited: 0,
            total_withdrawn: 0,
        }
    }

    /// The record's own address, derived from the owner (and heir, for single-heir records).
    pub fn address(&self) -> Address {
        match self.kind {
            AccountKind::MultiHeirCustodial => custodial_address(&self.owner),
            AccountKind::SingleHeir => {
                let heir = self.heirs.first().map(|h| h.heir).unwrap_or_default();
                single_heir_address(&self.owner, &heir)
            }
        }
    }

    pub fn vault_address(&self) -> Address {
        vault_address(&self.address())
    }

    /// Check the structural invariants of the heir list.
    pub fn validate(&self) -> Result<(), ProgramError> {
        validate_heirs(&self.owner, &self.heirs)?;
        let record = self.address();
        let vault = self.vault_address();
        if let Some(share) = self.heirs.iter().find(|h| h.heir.wallet() == record || h.heir.wallet() == vault) {
            return Err(ProgramError::HeirIsAccountAddress(share.heir.to_string()));
        }
        if self.kind == AccountKind::SingleHeir && self.heirs.len() != 1 {
            return Err(ProgramError::TooManyHeirs { count: self.heirs.len(), max: 1 });
        }
        if self.inactivity_period_seconds <= 0 {
            return Err(ProgramError::InvalidInactivityPeriod(self.inactivity_period_seconds));
        }
        Ok(())
    }
}

/// Tier-independent heir list rules: non-empty, unique, excludes the owner,
/// no zero shares, sums to exactly 100.
pub fn validate_heirs(owner: &Identity, heirs: &[HeirShare]) -> Result<(), ProgramError> {
    if heirs.is_empty() {
        return Err(ProgramError::NoHeirsProvided);
    }
    if heirs.len() > PREMIUM_MAX_HEIRS {
        return Err(ProgramError::TooManyHeirs { count: heirs.len(), max: PREMIUM_MAX_HEIRS });
    }
    let mut seen = HashSet::with_capacity(heirs.len());
    for share in heirs {
        if share.heir == *owner {
            return Err(ProgramError::OwnerAsHeir);
        }
        if share.allocation.get() == 0 {
            return Err(AccountError::InvalidPercentage(0).into());
        }
        if !seen.insert(share.heir) {
            return Err(ProgramError::DuplicateHeir(share.heir.to_string()));
        }
    }
    let sum = allocation_sum(heirs);
    if sum != 100 {
        return Err(ProgramError::AllocationSumInvalid(sum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percentage;

    fn id(seed: u8) -> Identity {
        Identity([seed; 32])
    }

    fn share(seed: u8, pct: u8) -> HeirShare {
        HeirShare::new(id(seed), Percentage::new(pct).unwrap())
    }

    fn sample_account() -> CustodialAccount {
        CustodialAccount::new(
            id(1),
            AccountKind::MultiHeirCustodial,
            vec![share(2, 60), share(3, 40)],
            3600,
            1_000,
        )
    }

    #[test]
    fn record_roundtrip() {
        let acct = sample_account();
        let bytes = acct.to_bytes().unwrap();
        assert_eq!(&bytes[..8], &CustodialAccount::DISCRIMINATOR);
        assert_eq!(CustodialAccount::from_bytes(&bytes).unwrap(), acct);
    }

    #[test]
    fn decode_rejects_foreign_discriminator() {
        let treasury = Treasury { admin: id(1), total_balance: 5 };
        let bytes = treasury.to_bytes().unwrap();
        assert!(matches!(
            PlatformConfig::from_bytes(&bytes),
            Err(AccountError::InvalidDiscriminator { .. })
        ));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = Treasury { admin: id(1), total_balance: 5 }.to_bytes().unwrap();
        bytes.push(0);
        assert_eq!(Treasury::from_bytes(&bytes), Err(AccountError::TrailingBytes(1)));
    }

    #[test]
    fn decode_rejects_short_input() {
        assert_eq!(Treasury::from_bytes(b"BQ/"), Err(AccountError::TooShort(3)));
    }

    #[test]
    fn has_discriminator_checks_prefix() {
        let bytes = sample_account().to_bytes().unwrap();
        assert!(has_discriminator(&bytes, &CustodialAccount::DISCRIMINATOR));
        assert!(!has_discriminator(&bytes, &UserProfile::DISCRIMINATOR));
        assert!(!has_discriminator(&[], &UserProfile::DISCRIMINATOR));
    }

    #[test]
    fn heirs_must_sum_to_100() {
        assert!(validate_heirs(&id(1), &[share(2, 60), share(3, 40)]).is_ok());
        assert_eq!(
            validate_heirs(&id(1), &[share(2, 60), share(3, 30)]),
            Err(ProgramError::AllocationSumInvalid(90))
        );
    }

    #[test]
    fn heirs_reject_empty_duplicates_and_owner() {
        assert_eq!(validate_heirs(&id(1), &[]), Err(ProgramError::NoHeirsProvided));
        assert!(matches!(
            validate_heirs(&id(1), &[share(2, 50), share(2, 50)]),
            Err(ProgramError::DuplicateHeir(_))
        ));
        assert_eq!(validate_heirs(&id(1), &[share(1, 100)]), Err(ProgramError::OwnerAsHeir));
    }

    #[test]
    fn heirs_capped_at_premium_limit() {
        let heirs: Vec<HeirShare> = (0..11u8).map(|i| share(10 + i, 9)).collect();
        assert_eq!(
            validate_heirs(&id(1), &heirs),
            Err(ProgramError::TooManyHeirs { count: 11, max: PREMIUM_MAX_HEIRS })
        );
    }

    #[test]
    fn free_profile_limits() {
        let profile = UserProfile {
            user: id(1),
            is_premium: false,
            total_inheritances_created: 0,
            total_fees_paid: 0,
            created_at: 0,
        };
        assert!(profile.check_heir_count(1).is_ok());
        assert_eq!(profile.check_heir_count(2), Err(ProgramError::TooManyHeirs { count: 2, max: 1 }));
        assert!(profile.check_inactivity_period(DEFAULT_INACTIVITY_PERIOD_SECS).is_ok());
        assert!(matches!(
            profile.check_inactivity_period(60),
            Err(ProgramError::CustomInactivityNotAllowed { got: 60, .. })
        ));
    }

    #[test]
    fn premium_profile_limits() {
        let profile = UserProfile {
            user: id(1),
            is_premium: true,
            total_inheritances_created: 0,
            total_fees_paid: 0,
            created_at: 0,
        };
        assert!(profile.check_heir_count(10).is_ok());
        assert!(profile.check_inactivity_period(60).is_ok());
        assert_eq!(profile.check_inactivity_period(0), Err(ProgramError::InvalidInactivityPeriod(0)));
    }

    #[test]
    fn single_heir_address_uses_heir() {
        let acct = CustodialAccount::new(id(1), AccountKind::SingleHeir, vec![share(2, 100)], 60, 0);
        assert_eq!(acct.address(), single_heir_address(&id(1), &id(2)));
        assert_ne!(acct.vault_address(), acct.address());
        assert!(acct.validate().is_ok());
    }

    #[test]
    fn heirs_cannot_be_the_account_itself() {
        let mut acct = sample_account();
        let vault = Identity(acct.vault_address().0);
        acct.heirs = vec![share(2, 50), HeirShare::new(vault, Percentage::new(50).unwrap())];
        assert_eq!(acct.validate(), Err(ProgramError::HeirIsAccountAddress(vault.to_string())));

        let record = Identity(acct.address().0);
        acct.heirs = vec![HeirShare::new(record, Percentage::FULL)];
        assert_eq!(acct.validate(), Err(ProgramError::HeirIsAccountAddress(record.to_string())));
    }

    #[test]
    fn average_inheritance_value_handles_zero() {
        let mut cfg = PlatformConfig::new(id(1), FeeBps::new(50).unwrap());
        assert_eq!(cfg.average_inheritance_value(), 0);
        cfg.total_inheritances_executed = 4;
        cfg.total_inheritance_value = 1_000;
        assert_eq!(cfg.average_inheritance_value(), 250);
    }
}
