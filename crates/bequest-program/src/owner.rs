//! Owner-signed instructions: profiles, custodial accounts, funds and activity.
//!
//! Every mutation of an existing custodial account also records owner
//! activity at the instruction's ledger time.

use tracing::info;

use bequest_core::accounts::{validate_heirs, AccountKind, CustodialAccount, UserProfile};
use bequest_core::activity::record_activity;
use bequest_core::address::{custodial_address, single_heir_address, user_profile_address};
use bequest_core::error::ProgramError;
use bequest_core::instruction::AccountTarget;
use bequest_core::store::AccountStore;
use bequest_core::types::{Address, HeirShare, Identity, Percentage};

use crate::context::InstructionContext;

fn require_running<S: AccountStore + ?Sized>(ctx: &InstructionContext<'_, S>) -> Result<(), ProgramError> {
    if ctx.platform()?.is_paused {
        return Err(ProgramError::PlatformPaused);
    }
    Ok(())
}

fn require_profile<S: AccountStore + ?Sized>(ctx: &InstructionContext<'_, S>) -> Result<UserProfile, ProgramError> {
    ctx.require(&user_profile_address(&ctx.signer))
}

/// Load the signer's own, not yet executed, account at `target`.
fn load_owned<S: AccountStore + ?Sized>(
    ctx: &InstructionContext<'_, S>,
    target: &AccountTarget,
) -> Result<(Address, CustodialAccount), ProgramError> {
    let address = target.address(&ctx.signer);
    let account: CustodialAccount = ctx.require(&address)?;
    if account.owner != ctx.signer {
        return Err(ProgramError::Unauthorized);
    }
    if account.is_executed {
        return Err(ProgramError::AlreadyExecuted);
    }
    Ok((address, account))
}

pub fn create_user_profile<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    is_premium: bool,
) -> Result<(), ProgramError> {
    require_running(ctx)?;
    let mut config = ctx.platform()?;
    let profile = UserProfile {
        user: ctx.signer,
        is_premium,
        total_inheritances_created: 0,
        total_fees_paid: 0,
        created_at: ctx.now,
    };
    ctx.create(&user_profile_address(&ctx.signer), &profile)?;
    config.total_users += 1;
    if is_premium {
        config.premium_users += 1;
    }
    ctx.save_platform(&config)?;
    info!(user = %ctx.signer, is_premium, "user profile created");
    Ok(())
}

pub fn upgrade_to_premium<S: AccountStore + ?Sized>(ctx: &mut InstructionContext<'_, S>) -> Result<(), ProgramError> {
    let mut profile = require_profile(ctx)?;
    if profile.is_premium {
        return Err(ProgramError::AlreadyPremium);
    }
    let mut config = ctx.platform()?;
    profile.is_premium = true;
    config.premium_users += 1;
    ctx.save(&user_profile_address(&ctx.signer), &profile)?;
    ctx.save_platform(&config)?;
    info!(user = %ctx.signer, "upgraded to premium");
    Ok(())
}

/// Validate and persist a new custodial record, bumping the owner's counter.
fn initialize_account<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    kind: AccountKind,
    heirs: Vec<HeirShare>,
    inactivity_period_seconds: i64,
) -> Result<CustodialAccount, ProgramError> {
    require_running(ctx)?;
    let mut profile = require_profile(ctx)?;
    validate_heirs(&ctx.signer, &heirs)?;
    if kind == AccountKind::MultiHeirCustodial {
        profile.check_heir_count(heirs.len())?;
    }
    profile.check_inactivity_period(inactivity_period_seconds)?;

    let account = CustodialAccount::new(ctx.signer, kind, heirs, inactivity_period_seconds, ctx.now);
    account.validate()?;
    ctx.create(&account.address(), &account)?;
    profile.total_inheritances_created += 1;
    ctx.save(&user_profile_address(&ctx.signer), &profile)?;
    Ok(account)
}

pub fn create_custodial_account<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    heirs: Vec<HeirShare>,
    inactivity_period_seconds: i64,
) -> Result<(), ProgramError> {
    let account = initialize_account(ctx, AccountKind::MultiHeirCustodial, heirs, inactivity_period_seconds)?;
    info!(
        owner = %account.owner,
        address = %custodial_address(&account.owner),
        heirs = account.heirs.len(),
        period = inactivity_period_seconds,
        "custodial account created"
    );
    Ok(())
}

/// Create a single-heir record and fund it from the owner's wallet in one unit.
pub fn create_single_heir<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    heir: Identity,
    amount: u64,
    inactivity_period_seconds: i64,
) -> Result<(), ProgramError> {
    if amount == 0 {
        return Err(ProgramError::ZeroAmount);
    }
    let heirs = vec![HeirShare::new(heir, Percentage::FULL)];
    let mut account = initialize_account(ctx, AccountKind::SingleHeir, heirs, inactivity_period_seconds)?;
    let address = single_heir_address(&ctx.signer, &heir);
    ctx.transfer(&ctx.signer.wallet(), &account.vault_address(), amount)?;
    account.total_deposited = amount;
    ctx.save(&address, &account)?;
    info!(owner = %ctx.signer, %heir, amount, "single-heir account created");
    Ok(())
}

pub fn deposit<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    target: AccountTarget,
    amount: u64,
) -> Result<(), ProgramError> {
    if amount == 0 {
        return Err(ProgramError::ZeroAmount);
    }
    let (address, mut account) = load_owned(ctx, &target)?;
    ctx.transfer(&ctx.signer.wallet(), &account.vault_address(), amount)?;
    account.total_deposited = account
        .total_deposited
        .checked_add(amount)
        .ok_or(ProgramError::ArithmeticOverflow)?;
    record_activity(&mut account, ctx.now);
    ctx.save(&address, &account)?;
    info!(owner = %ctx.signer, %address, amount, "deposit");
    Ok(())
}

pub fn withdraw<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    target: AccountTarget,
    amount: u64,
) -> Result<(), ProgramError> {
    if amount == 0 {
        return Err(ProgramError::ZeroAmount);
    }
    let (address, mut account) = load_owned(ctx, &target)?;
    let vault = account.vault_address();
    let have = ctx.balance(&vault)?;
    if have < amount {
        return Err(ProgramError::InsufficientBalance { have, need: amount });
    }
    ctx.transfer(&vault, &ctx.signer.wallet(), amount)?;
    account.total_withdrawn = account.total_withdrawn.saturating_add(amount);
    record_activity(&mut account, ctx.now);
    ctx.save(&address, &account)?;
    info!(owner = %ctx.signer, %address, amount, "withdrawal");
    Ok(())
}

pub fn heartbeat<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    target: AccountTarget,
) -> Result<(), ProgramError> {
    let (address, mut account) = load_owned(ctx, &target)?;
    record_activity(&mut account, ctx.now);
    ctx.save(&address, &account)?;
    Ok(())
}

/// Premium only.
pub fn update_inactivity_period<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    target: AccountTarget,
    seconds: i64,
) -> Result<(), ProgramError> {
    let profile = require_profile(ctx)?;
    if !profile.is_premium {
        return Err(ProgramError::PremiumRequired);
    }
    profile.check_inactivity_period(seconds)?;
    let (address, mut account) = load_owned(ctx, &target)?;
    account.inactivity_period_seconds = seconds;
    record_activity(&mut account, ctx.now);
    ctx.save(&address, &account)?;
    info!(owner = %ctx.signer, %address, seconds, "inactivity period updated");
    Ok(())
}

/// Replace the whole heir list of the multi-heir account. Premium only.
pub fn update_heirs<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    heirs: Vec<HeirShare>,
) -> Result<(), ProgramError> {
    let profile = require_profile(ctx)?;
    if !profile.is_premium {
        return Err(ProgramError::PremiumRequired);
    }
    validate_heirs(&ctx.signer, &heirs)?;
    profile.check_heir_count(heirs.len())?;
    let (address, mut account) = load_owned(ctx, &AccountTarget::Custodial)?;
    if account.kind != AccountKind::MultiHeirCustodial {
        return Err(ProgramError::WrongAccountKind(account.kind.to_string()));
    }
    account.heirs = heirs;
    account.validate()?;
    record_activity(&mut account, ctx.now);
    ctx.save(&address, &account)?;
    info!(owner = %ctx.signer, heirs = account.heirs.len(), "heirs updated");
    Ok(())
}
