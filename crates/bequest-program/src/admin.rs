//! Platform control plane: initialization, fees, pause, treasury and admin handover.

use serde::{Deserialize, Serialize};
use tracing::info;

use bequest_core::accounts::{PlatformConfig, Record, Treasury};
use bequest_core::address::{platform_config_address, treasury_address};
use bequest_core::constants::{DEFAULT_PLATFORM_FEE_BPS, MAX_PLATFORM_FEE_BPS};
use bequest_core::error::ProgramError;
use bequest_core::store::AccountStore;
use bequest_core::types::{FeeBps, Identity};

use crate::context::InstructionContext;

/// Create the platform config and treasury singletons with the signer as admin.
pub fn initialize<S: AccountStore + ?Sized>(ctx: &mut InstructionContext<'_, S>) -> Result<(), ProgramError> {
    let fee = FeeBps::new(DEFAULT_PLATFORM_FEE_BPS)?;
    let admin = ctx.signer;
    ctx.create(&platform_config_address(), &PlatformConfig::new(admin, fee))?;
    ctx.create(&treasury_address(), &Treasury { admin, total_balance: 0 })?;
    info!(%admin, fee_bps = fee.get(), "platform initialized");
    Ok(())
}

fn require_admin<S: AccountStore + ?Sized>(ctx: &InstructionContext<'_, S>) -> Result<PlatformConfig, ProgramError> {
    let config = ctx.platform()?;
    if config.admin != ctx.signer {
        return Err(ProgramError::UnauthorizedAdmin);
    }
    Ok(config)
}

pub fn set_platform_fee<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    bps: u16,
) -> Result<(), ProgramError> {
    let mut config = require_admin(ctx)?;
    if bps > MAX_PLATFORM_FEE_BPS {
        return Err(ProgramError::FeeTooHigh { bps, max: MAX_PLATFORM_FEE_BPS });
    }
    config.platform_fee_bps = FeeBps::new(bps)?;
    ctx.save_platform(&config)?;
    info!(bps, "platform fee updated");
    Ok(())
}

/// Halt execution and account creation. Pausing a paused platform refreshes
/// `pause_timestamp`.
pub fn pause<S: AccountStore + ?Sized>(ctx: &mut InstructionContext<'_, S>) -> Result<(), ProgramError> {
    let mut config = require_admin(ctx)?;
    config.is_paused = true;
    config.pause_timestamp = ctx.now;
    ctx.save_platform(&config)?;
    info!(at = ctx.now, "platform paused");
    Ok(())
}

pub fn resume<S: AccountStore + ?Sized>(ctx: &mut InstructionContext<'_, S>) -> Result<(), ProgramError> {
    let mut config = require_admin(ctx)?;
    config.is_paused = false;
    config.pause_timestamp = 0;
    ctx.save_platform(&config)?;
    info!("platform resumed");
    Ok(())
}

/// Pay `amount` of collected fees out to the admin's wallet.
pub fn withdraw_treasury<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    amount: u64,
) -> Result<(), ProgramError> {
    let config = require_admin(ctx)?;
    if amount == 0 {
        return Err(ProgramError::ZeroAmount);
    }
    let address = treasury_address();
    let mut treasury: Treasury = ctx.require(&address)?;
    let held = ctx.balance(&address)?;
    let available = treasury.total_balance.min(held);
    if amount > available {
        return Err(ProgramError::InsufficientTreasuryBalance { have: available, need: amount });
    }
    ctx.transfer(&address, &config.admin.wallet(), amount)?;
    treasury.total_balance -= amount;
    ctx.save(&address, &treasury)?;
    info!(amount, remaining = treasury.total_balance, "treasury withdrawal");
    Ok(())
}

/// Hand the platform to `new_admin`, updating config and treasury together.
pub fn transfer_admin<S: AccountStore + ?Sized>(
    ctx: &mut InstructionContext<'_, S>,
    new_admin: Identity,
) -> Result<(), ProgramError> {
    let mut config = require_admin(ctx)?;
    let address = treasury_address();
    let mut treasury: Treasury = ctx.require(&address)?;
    let old_admin = config.admin;
    config.admin = new_admin;
    treasury.admin = new_admin;
    ctx.save_platform(&config)?;
    ctx.save(&address, &treasury)?;
    info!(%old_admin, %new_admin, "admin transferred");
    Ok(())
}

/// Read-only platform summary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlatformAnalytics {
    pub admin: Identity,
    pub platform_fee_bps: u16,
    pub is_paused: bool,
    pub total_users: u64,
    pub premium_users: u64,
    pub total_inheritances_executed: u64,
    pub total_fees_collected: u64,
    pub total_inheritance_value: u64,
    pub average_inheritance_value: u64,
    pub treasury_balance: u64,
}

impl PlatformAnalytics {
    pub fn from_records(config: &PlatformConfig, treasury: &Treasury) -> Self {
        Self {
            admin: config.admin,
            platform_fee_bps: config.platform_fee_bps.get(),
            is_paused: config.is_paused,
            total_users: config.total_users,
            premium_users: config.premium_users,
            total_inheritances_executed: config.total_inheritances_executed,
            total_fees_collected: config.total_fees_collected,
            total_inheritance_value: config.total_inheritance_value,
            average_inheritance_value: config.average_inheritance_value(),
            treasury_balance: treasury.total_balance,
        }
    }
}

pub fn platform_analytics<S: AccountStore + ?Sized>(store: &S) -> Result<PlatformAnalytics, ProgramError> {
    let config = store
        .get_data(&platform_config_address())?
        .ok_or(ProgramError::NotInitialized)?;
    let treasury = store
        .get_data(&treasury_address())?
        .ok_or(ProgramError::NotInitialized)?;
    Ok(PlatformAnalytics::from_records(
        &PlatformConfig::from_bytes(&config)?,
        &Treasury::from_bytes(&treasury)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bequest_core::store::{AccountEntry, MemoryStore};

    fn admin() -> Identity {
        Identity([1u8; 32])
    }

    fn initialized() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut ctx = InstructionContext::new(&mut store, admin(), 10);
        initialize(&mut ctx).unwrap();
        store
    }

    #[test]
    fn initialize_once() {
        let mut store = initialized();
        let mut ctx = InstructionContext::new(&mut store, admin(), 10);
        assert!(matches!(initialize(&mut ctx), Err(ProgramError::AlreadyExists(_))));
        let analytics = platform_analytics(&store).unwrap();
        assert_eq!(analytics.platform_fee_bps, DEFAULT_PLATFORM_FEE_BPS);
        assert_eq!(analytics.admin, admin());
    }

    #[test]
    fn fee_bounds_and_auth() {
        let mut store = initialized();
        let mut ctx = InstructionContext::new(&mut store, admin(), 10);
        set_platform_fee(&mut ctx, 200).unwrap();
        assert_eq!(set_platform_fee(&mut ctx, 201), Err(ProgramError::FeeTooHigh { bps: 201, max: 200 }));

        let mut ctx = InstructionContext::new(&mut store, Identity([2u8; 32]), 10);
        assert_eq!(set_platform_fee(&mut ctx, 10), Err(ProgramError::UnauthorizedAdmin));
        assert_eq!(platform_analytics(&store).unwrap().platform_fee_bps, 200);
    }

    #[test]
    fn pause_and_resume_are_repeatable() {
        let mut store = initialized();
        let mut ctx = InstructionContext::new(&mut store, admin(), 50);
        pause(&mut ctx).unwrap();
        pause(&mut ctx).unwrap();
        let cfg = ctx.platform().unwrap();
        assert!(cfg.is_paused);
        assert_eq!(cfg.pause_timestamp, 50);
        resume(&mut ctx).unwrap();
        resume(&mut ctx).unwrap();
        let cfg = ctx.platform().unwrap();
        assert!(!cfg.is_paused);
        assert_eq!(cfg.pause_timestamp, 0);
    }

    #[test]
    fn withdraw_treasury_bounded() {
        let mut store = initialized();
        let address = treasury_address();
        let mut entry = store.get_entry(&address).unwrap().unwrap();
        entry.balance = 100;
        entry.data = Treasury { admin: admin(), total_balance: 100 }.to_bytes().unwrap();
        store.put_entry(address, entry).unwrap();

        let mut ctx = InstructionContext::new(&mut store, admin(), 10);
        assert_eq!(
            withdraw_treasury(&mut ctx, 101),
            Err(ProgramError::InsufficientTreasuryBalance { have: 100, need: 101 })
        );
        assert_eq!(withdraw_treasury(&mut ctx, 0), Err(ProgramError::ZeroAmount));
        withdraw_treasury(&mut ctx, 60).unwrap();
        assert_eq!(ctx.balance(&admin().wallet()).unwrap(), 60);
        assert_eq!(ctx.require::<Treasury>(&address).unwrap().total_balance, 40);
    }

    #[test]
    fn transfer_admin_updates_both_singletons() {
        let mut store = initialized();
        let new_admin = Identity([9u8; 32]);
        let mut ctx = InstructionContext::new(&mut store, admin(), 10);
        transfer_admin(&mut ctx, new_admin).unwrap();
        assert_eq!(ctx.platform().unwrap().admin, new_admin);
        assert_eq!(ctx.require::<Treasury>(&treasury_address()).unwrap().admin, new_admin);
        assert_eq!(pause(&mut ctx), Err(ProgramError::UnauthorizedAdmin));
    }

    #[test]
    fn analytics_requires_initialization() {
        let mut store = MemoryStore::new();
        assert_eq!(platform_analytics(&store), Err(ProgramError::NotInitialized));
        store.put_entry(platform_config_address(), AccountEntry::default()).unwrap();
        assert_eq!(platform_analytics(&store), Err(ProgramError::NotInitialized));
    }
}
