//! Read-only views over a store: custodial enumeration and eligibility.

use bequest_core::accounts::{CustodialAccount, Record};
use bequest_core::error::{AccountError, ProgramError};
use bequest_core::store::AccountStore;
use bequest_core::types::Address;

use crate::execution::{inheritance_state, InheritanceState};

/// Every custodial record in the store, ordered by address.
pub fn custodial_accounts<S: AccountStore + ?Sized>(
    store: &S,
) -> Result<Vec<(Address, CustodialAccount)>, ProgramError> {
    store
        .scan(&CustodialAccount::DISCRIMINATOR)?
        .into_iter()
        .map(|(address, data)| Ok((address, CustodialAccount::from_bytes(&data)?)))
        .collect()
}

/// Whether `execute_inheritance` would accept the account at `now`, ignoring
/// the vault balance and the pause flag.
pub fn is_eligible(account: &CustodialAccount, now: i64) -> bool {
    inheritance_state(account, now) == InheritanceState::EligibleForExecution
}

/// Decode raw custodial record bytes as read from a ledger and keep the
/// account only if it is eligible at `now`.
pub fn decode_eligible(data: &[u8], now: i64) -> Result<Option<CustodialAccount>, AccountError> {
    let account = CustodialAccount::from_bytes(data)?;
    Ok(is_eligible(&account, now).then_some(account))
}

pub fn list_eligible_accounts<S: AccountStore + ?Sized>(
    store: &S,
    now: i64,
) -> Result<Vec<(Address, CustodialAccount)>, ProgramError> {
    Ok(custodial_accounts(store)?
        .into_iter()
        .filter(|(_, a)| is_eligible(a, now))
        .collect())
}
