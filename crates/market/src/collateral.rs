use dexchain_ledger::LedgerView;
use dexchain_primitives::{amount::Amount, errors::PriceError, price::Price};
use dexchain_state::market::{CollateralRecord, MarketIndexKey, MarketPair};

use crate::ruleset::MarketRuleset;

/// Feed price below which a position gets called:
/// `payoff / (collateral * ratio)`.
pub fn call_price(
    pair: MarketPair,
    payoff: Amount,
    collateral: Amount,
    ruleset: &MarketRuleset,
) -> Result<Price, PriceError> {
    let (num, den) = ruleset.collateral_ratio;
    let collateral =
        u128::try_from(collateral).map_err(|_| PriceError::NegativeAmount(collateral))?;
    let payoff = u128::try_from(payoff).map_err(|_| PriceError::NegativeAmount(payoff))?;
    let counted = collateral.checked_mul(num).ok_or(PriceError::Overflow)? / den;
    if counted == 0 {
        return Ok(pair.max_price());
    }
    Price::from_fraction(payoff, counted, pair.quote_id, pair.base_id)
}

/// Moves a position from `old` to the key for its new call price.  The old
/// key is removed first since the price is part of the key.  A position
/// already at the new key is merged into.
pub fn rekey_collateral<V: LedgerView + ?Sized>(
    view: &mut V,
    old: &MarketIndexKey,
    rec: CollateralRecord,
    ruleset: &MarketRuleset,
) -> Result<Option<MarketIndexKey>, PriceError> {
    view.store_collateral(*old, CollateralRecord::default());
    assert!(
        view.get_collateral(old).is_none(),
        "collateral still indexed at its old call price"
    );

    if rec.is_null() {
        return Ok(None);
    }

    let pair = old.market();
    let price = call_price(pair, rec.payoff_balance, rec.collateral_balance, ruleset)?;
    let key = MarketIndexKey::new(price, old.owner);
    let merged = match view.get_collateral(&key) {
        Some(mut existing) => {
            existing.collateral_balance += rec.collateral_balance;
            existing.payoff_balance += rec.payoff_balance;
            existing
        }
        None => rec,
    };
    view.store_collateral(key, merged);
    Ok(Some(key))
}
