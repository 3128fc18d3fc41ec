//! Instruction dispatch.

use tracing::debug;

use bequest_core::error::ProgramError;
use bequest_core::instruction::{Instruction, Transaction, Transfer};
use bequest_core::store::AccountStore;

use crate::context::InstructionContext;
use crate::{admin, execution, owner};

/// Run one verified transaction against `store` at ledger time `now`.
///
/// `store` should be a staging overlay: on `Err` some writes may already be
/// staged and must be discarded by the caller.
pub fn process_transaction<S: AccountStore + ?Sized>(
    store: &mut S,
    tx: &Transaction,
    now: i64,
) -> Result<Vec<Transfer>, ProgramError> {
    debug!(instruction = tx.instruction.name(), signer = %tx.signer, now, "processing");
    let mut ctx = InstructionContext::new(store, tx.signer, now);
    match &tx.instruction {
        Instruction::Initialize => admin::initialize(&mut ctx)?,
        Instruction::SetPlatformFee { bps } => admin::set_platform_fee(&mut ctx, *bps)?,
        Instruction::Pause => admin::pause(&mut ctx)?,
        Instruction::Resume => admin::resume(&mut ctx)?,
        Instruction::WithdrawTreasury { amount } => admin::withdraw_treasury(&mut ctx, *amount)?,
        Instruction::TransferAdmin { new_admin } => admin::transfer_admin(&mut ctx, *new_admin)?,
        Instruction::CreateUserProfile { is_premium } => owner::create_user_profile(&mut ctx, *is_premium)?,
        Instruction::UpgradeToPremium => owner::upgrade_to_premium(&mut ctx)?,
        Instruction::CreateCustodialAccount { heirs, inactivity_period_seconds } => {
            owner::create_custodial_account(&mut ctx, heirs.clone(), *inactivity_period_seconds)?
        }
        Instruction::CreateSingleHeir { heir, amount, inactivity_period_seconds } => {
            owner::create_single_heir(&mut ctx, *heir, *amount, *inactivity_period_seconds)?
        }
        Instruction::Deposit { target, amount } => owner::deposit(&mut ctx, *target, *amount)?,
        Instruction::Withdraw { target, amount } => owner::withdraw(&mut ctx, *target, *amount)?,
        Instruction::Heartbeat { target } => owner::heartbeat(&mut ctx, *target)?,
        Instruction::UpdateInactivityPeriod { target, seconds } => {
            owner::update_inactivity_period(&mut ctx, *target, *seconds)?
        }
        Instruction::UpdateHeirs { heirs } => owner::update_heirs(&mut ctx, heirs.clone())?,
        Instruction::ExecuteInheritance { account } => {
            execution::execute_inheritance(&mut ctx, account)?;
        }
    }
    Ok(ctx.into_transfers())
}
