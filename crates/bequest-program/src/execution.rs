//! The inheritance state machine.
//!
//! ```text
//! Active --(inactivity period elapses)--> EligibleForExecution --execute--> Executed
//!    ^                                          |
//!    +------------(owner activity)--------------+
//! ```
//!
//! `EligibleForExecution` is never stored; it is computed from the record and
//! ledger time. `Executed` is terminal.

use serde::{Deserialize, Serialize};
use tracing::info;

use bequest_core::accounts::{CustodialAccount, Treasury, UserProfile};
use bequest_core::activity::{inactive_at, is_inactive};
use bequest_core::address::{treasury_address, user_profile_address};
use bequest_core::distribution::{compute_distribution, Distribution};
use bequest_core::error::ProgramError;
use bequest_core::store::AccountStore;
use bequest_core::types::Address;

use crate::context::InstructionContext;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InheritanceState {
    Active,
    EligibleForExecution,
    Executed,
}

pub fn inheritance_state(account: &CustodialAccount, now: i64) -> InheritanceState {
    if account.is_executed {
        InheritanceState::Executed
    } else if is_inactive(account, now) {
        InheritanceState::EligibleForExecution
    } else {
        InheritanceState::Active
    }
}

/// Distribute an inactive owner's vault to the heirs and the treasury.
///
/// Checks, in order: platform running, not executed, owner inactive, vault
/// non-empty. Nothing is written unless all four hold.
pub fn execute_inheritance<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    address: &Address,
) -> Result<Distribution, ProgramError> {
    let mut config = ctx.platform()?;
    if config.is_paused {
        return Err(ProgramError::PlatformPaused);
    }
    let mut account: CustodialAccount = ctx.require(address)?;
    if account.is_executed {
        return Err(ProgramError::AlreadyExecuted);
    }
    if !is_inactive(&account, ctx.now) {
        return Err(ProgramError::NotYetInactive { inactive_at: inactive_at(&account) });
    }
    let vault = account.vault_address();
    let balance = ctx.balance(&vault)?;
    if balance == 0 {
        return Err(ProgramError::InsufficientBalance { have: 0, need: 1 });
    }

    let distribution = compute_distribution(balance, &account.heirs, config.platform_fee_bps)?;
    for (heir, amount) in &distribution.heir_amounts {
        ctx.transfer(&vault, &heir.wallet(), *amount)?;
    }
    let treasury_addr = treasury_address();
    ctx.transfer(&vault, &treasury_addr, distribution.fee_amount)?;
    let remaining = ctx.balance(&vault)?;
    if remaining != 0 {
        return Err(ProgramError::VaultNotEmptied(remaining));
    }

    let mut treasury: Treasury = ctx.require(&treasury_addr)?;
    treasury.total_balance = treasury
        .total_balance
        .checked_add(distribution.fee_amount)
        .ok_or(ProgramError::ArithmeticOverflow)?;
    ctx.save(&treasury_addr, &treasury)?;

    account.is_executed = true;
    account.executed_at = ctx.now;
    ctx.save(address, &account)?;

    config.total_fees_collected = config.total_fees_collected.saturating_add(distribution.fee_amount);
    config.total_inheritances_executed += 1;
    config.total_inheritance_value = config.total_inheritance_value.saturating_add(balance);
    ctx.save_platform(&config)?;

    let profile_addr = user_profile_address(&account.owner);
    if let Some(mut profile) = ctx.load::<UserProfile>(&profile_addr)? {
        profile.total_fees_paid = profile.total_fees_paid.saturating_add(distribution.fee_amount);
        ctx.save(&profile_addr, &profile)?;
    }

    info!(
        account = %address,
        owner = %account.owner,
        balance,
        fee = distribution.fee_amount,
        heirs = distribution.heir_amounts.len(),
        "inheritance executed"
    );
    Ok(distribution)
}
