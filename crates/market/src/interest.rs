//! Simple interest on short positions.
//!
//! Rates are in basis points per year and capped at
//! [`MAX_SHORT_APR_BPS`].  Everything is integer math in `u128`, floored.

use dexchain_params::constants::{MAX_SHORT_APR_BPS, SECONDS_PER_YEAR};
use dexchain_primitives::amount::Amount;

const BPS: u128 = 10_000;

fn rate_terms(apr_bps: u32, age_sec: u32) -> (u128, u128) {
    let apr = apr_bps.min(MAX_SHORT_APR_BPS) as u128;
    (apr * age_sec as u128, BPS * SECONDS_PER_YEAR as u128)
}

/// Interest accrued on `principal` over `age_sec`.
pub fn interest_owed(principal: Amount, apr_bps: u32, age_sec: u32) -> Amount {
    if principal <= 0 {
        return 0;
    }
    let (num, den) = rate_terms(apr_bps, age_sec);
    let owed = principal as u128 * num / den;
    Amount::try_from(owed).unwrap_or(Amount::MAX)
}

/// Interest part of a payment of `total` toward a position, the rest being
/// principal: `total - total / (1 + apr * years)`.
pub fn interest_paid(total: Amount, apr_bps: u32, age_sec: u32) -> Amount {
    if total <= 0 {
        return 0;
    }
    let (num, den) = rate_terms(apr_bps, age_sec);
    let principal = total as u128 * den / (den + num);
    total - principal as Amount
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_one_year_at_ten_percent() {
        assert_eq!(interest_owed(1_000_000, 1_000, SECONDS_PER_YEAR), 100_000);
        assert_eq!(interest_paid(1_100_000, 1_000, SECONDS_PER_YEAR), 100_000);
    }

    #[test]
    fn test_apr_capped() {
        let capped = interest_owed(1_000_000, MAX_SHORT_APR_BPS, SECONDS_PER_YEAR);
        assert_eq!(interest_owed(1_000_000, u32::MAX, SECONDS_PER_YEAR), capped);
    }

    #[test]
    fn test_zero_age_is_free() {
        assert_eq!(interest_owed(1_000_000, 5_000, 0), 0);
        assert_eq!(interest_paid(1_000_000, 5_000, 0), 0);
    }

    proptest! {
        #[test]
        fn proptest_interest_paid_bounded(
            total in 0i64..1_000_000_000_000,
            apr in 0u32..20_000,
            age in 0u32..100_000_000,
        ) {
            let paid = interest_paid(total, apr, age);
            prop_assert!(paid >= 0);
            prop_assert!(paid <= total);
        }
    }
}
