//! Inheritance distribution arithmetic.
//!
//! The platform fee is taken first, then each heir receives the floor of its
//! percentage of the remainder. Flooring dust goes to the last heir in list
//! order, so heir amounts plus fee always equal the input balance exactly.

use serde::{Deserialize, Serialize};

use crate::constants::{BPS_PRECISION, PERCENT_PRECISION};
use crate::error::ProgramError;
use crate::types::{FeeBps, HeirShare, Identity};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    /// Per-heir amounts in heir list order.
    pub heir_amounts: Vec<(Identity, u64)>,
    pub fee_amount: u64,
}

impl Distribution {
    pub fn total(&self) -> u128 {
        self.heir_amounts.iter().map(|(_, a)| u128::from(*a)).sum::<u128>()
            + u128::from(self.fee_amount)
    }
}

/// Split `balance` between the platform fee and `heirs`.
///
/// Intermediates are `u128`, so no input in range can overflow.
///
/// # Examples
///
/// ```
/// use bequest_core::distribution::compute_distribution;
/// use bequest_core::types::{FeeBps, HeirShare, Identity, Percentage};
///
/// let heirs = [
///     HeirShare::new(Identity([1; 32]), Percentage::new(60).unwrap()),
///     HeirShare::new(Identity([2; 32]), Percentage::new(40).unwrap()),
/// ];
/// let d = compute_distribution(10_000, &heirs, FeeBps::new(50).unwrap()).unwrap();
/// assert_eq!(d.fee_amount, 50);
/// assert_eq!(d.heir_amounts[0].1, 5_970);
/// assert_eq!(d.heir_amounts[1].1, 3_980);
/// ```
pub fn compute_distribution(
    balance: u64,
    heirs: &[HeirShare],
    fee_bps: FeeBps,
) -> Result<Distribution, ProgramError> {
    if heirs.is_empty() {
        return Err(ProgramError::NoHeirsProvided);
    }
    let balance_wide = u128::from(balance);
    let fee = balance_wide * u128::from(fee_bps.get()) / u128::from(BPS_PRECISION);
    let distributable = balance_wide - fee;

    let mut heir_amounts: Vec<(Identity, u64)> = Vec::with_capacity(heirs.len());
    let mut assigned: u128 = 0;
    for share in heirs {
        let amount = distributable * u128::from(share.allocation.get()) / u128::from(PERCENT_PRECISION);
        assigned += amount;
        heir_amounts.push((share.heir, narrow(amount)?));
    }

    // Flooring dust, and any shortfall from a list that does not sum to 100.
    let remainder = distributable.saturating_sub(assigned);
    if let Some(last) = heir_amounts.last_mut() {
        last.1 = narrow(u128::from(last.1) + remainder)?;
    }

    Ok(Distribution { heir_amounts, fee_amount: narrow(fee)? })
}

fn narrow(v: u128) -> Result<u64, ProgramError> {
    u64::try_from(v).map_err(|_| ProgramError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percentage;

    fn heirs(pcts: &[u8]) -> Vec<HeirShare> {
        pcts.iter()
            .enumerate()
            .map(|(i, p)| HeirShare::new(Identity([i as u8 + 1; 32]), Percentage::new(*p).unwrap()))
            .collect()
    }

    fn fee(bps: u16) -> FeeBps {
        FeeBps::new(bps).unwrap()
    }

    #[test]
    fn reference_split() {
        let d = compute_distribution(10_000, &heirs(&[60, 40]), fee(50)).unwrap();
        assert_eq!(d.fee_amount, 50);
        assert_eq!(d.heir_amounts.iter().map(|(_, a)| *a).collect::<Vec<_>>(), vec![5_970, 3_980]);
    }

    #[test]
    fn remainder_goes_to_last_heir() {
        let d = compute_distribution(100, &heirs(&[33, 33, 34]), fee(0)).unwrap();
        assert_eq!(d.heir_amounts.iter().map(|(_, a)| *a).collect::<Vec<_>>(), vec![33, 33, 34]);

        let d = compute_distribution(10, &heirs(&[33, 33, 34]), fee(0)).unwrap();
        // floors 3, 3, 3 with 1 unit of dust
        assert_eq!(d.heir_amounts.iter().map(|(_, a)| *a).collect::<Vec<_>>(), vec![3, 3, 4]);
    }

    #[test]
    fn zero_and_tiny_balances() {
        let d = compute_distribution(0, &heirs(&[50, 50]), fee(200)).unwrap();
        assert_eq!(d.total(), 0);
        let d = compute_distribution(1, &heirs(&[50, 50]), fee(200)).unwrap();
        assert_eq!(d.fee_amount, 0);
        assert_eq!(d.heir_amounts[0].1, 0);
        assert_eq!(d.heir_amounts[1].1, 1);
    }

    #[test]
    fn large_balance_does_not_overflow() {
        let balance = (1u64 << 63) - 1;
        let d = compute_distribution(balance, &heirs(&[1, 99]), fee(200)).unwrap();
        assert_eq!(d.total(), u128::from(balance));
        let d = compute_distribution(u64::MAX, &heirs(&[100]), fee(200)).unwrap();
        assert_eq!(d.total(), u128::from(u64::MAX));
    }

    #[test]
    fn empty_heirs_rejected() {
        assert_eq!(compute_distribution(100, &[], fee(0)), Err(ProgramError::NoHeirsProvided));
    }
}
