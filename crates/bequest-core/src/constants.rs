//! Protocol constants. All monetary values are in the ledger's smallest native unit.

/// Smallest units per whole native coin.
pub const COIN: u64 = 1_000_000_000;

/// Basis-point denominator (10_000 bps = 100%).
pub const BPS_PRECISION: u64 = 10_000;

/// Percentage denominator for heir allocations.
pub const PERCENT_PRECISION: u64 = 100;

/// Platform fee applied by `initialize`: 0.5%.
pub const DEFAULT_PLATFORM_FEE_BPS: u16 = 50;

/// Upper bound accepted by `set_platform_fee`: 2%.
pub const MAX_PLATFORM_FEE_BPS: u16 = 200;

/// Fixed inactivity period for free-tier accounts: 2 days.
///
/// # Examples
///
/// ```
/// use bequest_core::constants::DEFAULT_INACTIVITY_PERIOD_SECS;
/// assert_eq!(DEFAULT_INACTIVITY_PERIOD_SECS, 172_800);
/// ```
pub const DEFAULT_INACTIVITY_PERIOD_SECS: i64 = 2 * 24 * 60 * 60;

/// Maximum heirs per custodial account on the free tier.
pub const FREE_MAX_HEIRS: usize = 1;

/// Maximum heirs per custodial account on the premium tier.
pub const PREMIUM_MAX_HEIRS: usize = 10;

/// Domain separator mixed into every derived address.
pub const ADDRESS_DOMAIN: &[u8] = b"bequest/address/v1";

/// Namespace tags for derived addresses.
pub mod tags {
    pub const PLATFORM_CONFIG: &[u8] = b"platform_config";
    pub const TREASURY: &[u8] = b"treasury";
    pub const USER_PROFILE: &[u8] = b"user_profile";
    pub const CUSTODIAL: &[u8] = b"custodial";
    pub const SINGLE_HEIR: &[u8] = b"single_heir";
    pub const VAULT: &[u8] = b"vault";
}

/// Default JSON-RPC port for the ledger node.
pub const DEFAULT_RPC_PORT: u16 = 18_899;
