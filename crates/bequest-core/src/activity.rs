//! Owner activity tracking.
//!
//! An account is inactive once strictly more than `inactivity_period_seconds`
//! have elapsed since the last recorded owner activity. All functions take
//! ledger time explicitly; none of them reads a clock.

use crate::accounts::CustodialAccount;

/// Record owner activity at `now`. The timestamp never moves backwards.
pub fn record_activity(account: &mut CustodialAccount, now: i64) {
    account.last_active_timestamp = account.last_active_timestamp.max(now);
}

pub fn is_inactive(account: &CustodialAccount, now: i64) -> bool {
    now.saturating_sub(account.last_active_timestamp) > account.inactivity_period_seconds
}

/// First ledger time at which the account counts as inactive.
pub fn inactive_at(account: &CustodialAccount) -> i64 {
    account
        .last_active_timestamp
        .saturating_add(account.inactivity_period_seconds)
        .saturating_add(1)
}

/// Seconds remaining until the account becomes inactive; 0 once it is.
pub fn seconds_until_inactive(account: &CustodialAccount, now: i64) -> i64 {
    inactive_at(account).saturating_sub(now).max(0)
}
