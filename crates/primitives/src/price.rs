//! Fixed point exchange rates.
//!
//! A [`Price`] is the number of quote units paid per base unit, scaled by
//! [`PRICE_PRECISION`].  All conversions floor, and all intermediate math is
//! done in `u128` with overflow checks so every node rounds identically.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    amount::{Amount, Asset},
    errors::PriceError,
    ids::AssetId,
};

pub const PRICE_PRECISION: u128 = 1_000_000_000_000_000;

/// Field order matters: prices sort by market first, then by ratio.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Price {
    pub quote_id: AssetId,
    pub base_id: AssetId,
    pub ratio: u128,
}

fn to_u128(amount: Amount) -> Result<u128, PriceError> {
    u128::try_from(amount).map_err(|_| PriceError::NegativeAmount(amount))
}

fn to_amount(v: u128) -> Result<Amount, PriceError> {
    Amount::try_from(v).map_err(|_| PriceError::Overflow)
}

impl Price {
    pub const fn new(ratio: u128, quote_id: AssetId, base_id: AssetId) -> Self {
        Self {
            quote_id,
            base_id,
            ratio,
        }
    }

    /// `num / den` quote units per base unit.
    pub fn from_fraction(
        num: u128,
        den: u128,
        quote_id: AssetId,
        base_id: AssetId,
    ) -> Result<Self, PriceError> {
        if den == 0 {
            return Err(PriceError::ZeroDenominator);
        }
        let ratio = num
            .checked_mul(PRICE_PRECISION)
            .ok_or(PriceError::Overflow)?
            / den;
        Ok(Self::new(ratio, quote_id, base_id))
    }

    /// Price implied by trading `quote` for `base`.
    pub fn from_amounts(quote: Asset, base: Asset) -> Result<Self, PriceError> {
        Self::from_fraction(
            to_u128(quote.amount)?,
            to_u128(base.amount)?,
            quote.asset_id,
            base.asset_id,
        )
    }

    /// Lowest possible price in a market, useful as a range bound.
    pub const fn min_in(quote_id: AssetId, base_id: AssetId) -> Self {
        Self::new(0, quote_id, base_id)
    }

    /// Highest possible price in a market, useful as a range bound.
    pub const fn max_in(quote_id: AssetId, base_id: AssetId) -> Self {
        Self::new(u128::MAX, quote_id, base_id)
    }

    pub fn is_zero(&self) -> bool {
        self.ratio == 0
    }

    pub fn market(&self) -> (AssetId, AssetId) {
        (self.quote_id, self.base_id)
    }

    /// Quote units for `base` base units, rounded down.
    pub fn quote_for(&self, base: Amount) -> Result<Amount, PriceError> {
        let v = to_u128(base)?
            .checked_mul(self.ratio)
            .ok_or(PriceError::Overflow)?
            / PRICE_PRECISION;
        to_amount(v)
    }

    /// Quote units for `base` base units, rounded up.
    pub fn quote_for_ceil(&self, base: Amount) -> Result<Amount, PriceError> {
        let prod = to_u128(base)?
            .checked_mul(self.ratio)
            .ok_or(PriceError::Overflow)?;
        to_amount(prod.div_ceil(PRICE_PRECISION))
    }

    /// Base units purchasable with `quote` quote units, rounded down.
    pub fn base_for(&self, quote: Amount) -> Result<Amount, PriceError> {
        if self.ratio == 0 {
            return Err(PriceError::ZeroDenominator);
        }
        let v = to_u128(quote)?
            .checked_mul(PRICE_PRECISION)
            .ok_or(PriceError::Overflow)?
            / self.ratio;
        to_amount(v)
    }

    /// Base units needed to receive `quote` quote units, rounded up.
    pub fn base_for_ceil(&self, quote: Amount) -> Result<Amount, PriceError> {
        if self.ratio == 0 {
            return Err(PriceError::ZeroDenominator);
        }
        let prod = to_u128(quote)?
            .checked_mul(PRICE_PRECISION)
            .ok_or(PriceError::Overflow)?;
        to_amount(prod.div_ceil(self.ratio))
    }

    /// Multiplies the price by `num / den`.
    pub fn scale(&self, num: u128, den: u128) -> Result<Self, PriceError> {
        if den == 0 {
            return Err(PriceError::ZeroDenominator);
        }
        let ratio = self.ratio.checked_mul(num).ok_or(PriceError::Overflow)? / den;
        Ok(Self::new(ratio, self.quote_id, self.base_id))
    }

    /// Checks the price belongs to the given market.
    pub fn check_market(&self, quote_id: AssetId, base_id: AssetId) -> Result<(), PriceError> {
        if self.quote_id != quote_id {
            return Err(PriceError::AssetMismatch {
                expected: quote_id.inner(),
                got: self.quote_id.inner(),
            });
        }
        if self.base_id != base_id {
            return Err(PriceError::AssetMismatch {
                expected: base_id.inner(),
                got: self.base_id.inner(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.ratio / PRICE_PRECISION;
        let frac = self.ratio % PRICE_PRECISION;
        write!(
            f,
            "{whole}.{frac:015} #{}/#{}",
            self.quote_id, self.base_id
        )
    }
}
