//! Order book operations.  Each one escrows or releases funds through the
//! scratch balances, keeps the market depth current and marks the market
//! dirty so the engine runs on it at the end of the block.

use dexchain_ledger::{LedgerView, LedgerViewExt};
use dexchain_market::{interest_owed, interest_paid, rekey_collateral};
use dexchain_params::constants::MAX_SHORT_APR_BPS;
use dexchain_primitives::{
    amount::{Amount, Asset},
    ids::AssetId,
    price::Price,
};
use dexchain_state::{
    balance::{BalanceRecord, WithdrawCondition},
    market::{CollateralRecord, MarketIndexKey, MarketPair, MarketStatus, OrderKind, OrderRecord},
};
use tracing::*;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    pub(crate) fn evaluate_bid(
        &mut self,
        amount: Amount,
        index: &MarketIndexKey,
    ) -> EvalResult<()> {
        let pair = self.check_market(index)?;
        let delta = self.adjust_order(OrderKind::Bid, amount, index, pair.quote_id)?;
        self.update_depth(pair, delta, 0);
        Ok(())
    }

    pub(crate) fn evaluate_ask(
        &mut self,
        amount: Amount,
        index: &MarketIndexKey,
    ) -> EvalResult<()> {
        let pair = self.check_market(index)?;
        let delta = self.adjust_order(OrderKind::Ask, amount, index, pair.base_id)?;
        self.update_depth(pair, 0, delta);
        Ok(())
    }

    pub(crate) fn evaluate_short(
        &mut self,
        amount: Amount,
        index: &MarketIndexKey,
        interest_apr_bps: u32,
        limit_price: Option<Price>,
    ) -> EvalResult<()> {
        let pair = self.check_market(index)?;
        self.check_short_market(pair)?;
        if interest_apr_bps > MAX_SHORT_APR_BPS {
            return Err(EvalError::AprTooHigh(interest_apr_bps));
        }
        if let Some(limit) = &limit_price {
            limit.check_market(pair.quote_id, pair.base_id)?;
        }

        let delta = self.adjust_order(OrderKind::Short, amount, index, pair.base_id)?;
        if amount > 0 {
            let mut rec = self
                .pending
                .get_order(OrderKind::Short, index)
                .ok_or(EvalError::UnknownOrder(*index))?;
            if rec.balance < self.ruleset.min_short_order {
                return Err(EvalError::ShortTooSmall(rec.balance));
            }
            rec.interest_apr_bps = interest_apr_bps;
            rec.limit_price = limit_price;
            self.pending.store_order(OrderKind::Short, *index, rec);
        }
        self.update_depth(pair, delta, 0);
        Ok(())
    }

    /// Pays quote toward a position.  Interest is settled first under
    /// interest charging rules; a paid off position releases its collateral
    /// to the owner.
    pub(crate) fn evaluate_cover(
        &mut self,
        amount: Amount,
        cover_index: &MarketIndexKey,
    ) -> EvalResult<()> {
        if amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        let mut rec = self
            .pending
            .get_collateral(cover_index)
            .ok_or(EvalError::UnknownCollateral(*cover_index))?;
        self.require_signature(&cover_index.owner)?;

        let pair = cover_index.market();
        let age = self.now.secs_since(rec.opened);
        let interest_due = if self.ruleset.charges_interest {
            interest_owed(rec.payoff_balance, rec.interest_apr_bps, age)
        } else {
            0
        };
        let debt = rec.payoff_balance + interest_due;
        if amount > debt {
            return Err(EvalError::InsufficientOrderBalance {
                available: debt,
                requested: amount,
            });
        }

        let (principal, interest) = if amount == debt {
            (rec.payoff_balance, interest_due)
        } else if self.ruleset.charges_interest {
            let interest = interest_paid(amount, rec.interest_apr_bps, age);
            (amount - interest, interest)
        } else {
            (amount, 0)
        };

        self.sub_balance(Asset::new(amount, pair.quote_id))?;
        let mut quote = self.asset(pair.quote_id)?;
        quote.current_share_supply -= amount;
        quote.collected_fees += interest;
        self.pending.store_asset(quote);

        rec.payoff_balance -= principal;
        if rec.payoff_balance == 0 {
            let released = rec.collateral_balance;
            self.credit_owner(cover_index, Asset::new(released, pair.base_id));
            let closed = CollateralRecord::default();
            rekey_collateral(&mut self.pending, cover_index, closed, self.ruleset)?;
            self.update_depth(pair, 0, -released);
            debug!(owner = %cover_index.owner, %released, "position closed");
        } else {
            rekey_collateral(&mut self.pending, cover_index, rec, self.ruleset)?;
        }
        self.pending.mark_market_dirty(pair);
        Ok(())
    }

    /// Adds base to a position, lowering its call price.
    pub(crate) fn evaluate_add_collateral(
        &mut self,
        amount: Amount,
        cover_index: &MarketIndexKey,
    ) -> EvalResult<()> {
        if amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        let mut rec = self
            .pending
            .get_collateral(cover_index)
            .ok_or(EvalError::UnknownCollateral(*cover_index))?;

        let pair = cover_index.market();
        self.sub_balance(Asset::new(amount, pair.base_id))?;
        rec.collateral_balance = rec
            .collateral_balance
            .checked_add(amount)
            .ok_or(EvalError::Overflow)?;
        rekey_collateral(&mut self.pending, cover_index, rec, self.ruleset)?;
        self.update_depth(pair, 0, amount);
        self.pending.mark_market_dirty(pair);
        Ok(())
    }

    // ===== Helpers =====

    fn check_market(&self, index: &MarketIndexKey) -> EvalResult<MarketPair> {
        let pair = index.market();
        if pair.quote_id == pair.base_id {
            return Err(EvalError::InvalidMarket(pair.quote_id));
        }
        if index.order_price.is_zero() {
            return Err(EvalError::ZeroPrice);
        }
        self.asset(pair.quote_id)?;
        self.asset(pair.base_id)?;
        Ok(pair)
    }

    /// Shorts issue the quote asset against base collateral.
    fn check_short_market(&self, pair: MarketPair) -> EvalResult<()> {
        if !self.asset(pair.quote_id)?.is_market_issued() {
            return Err(EvalError::NotMarketIssued(pair.quote_id));
        }
        if !pair.base_id.is_base() {
            return Err(EvalError::InvalidMarket(pair.base_id));
        }
        Ok(())
    }

    /// Adds `amount` of `asset_id` to the order at `index`, or releases
    /// `-amount` of it.  Returns the change in escrow.
    fn adjust_order(
        &mut self,
        kind: OrderKind,
        amount: Amount,
        index: &MarketIndexKey,
        asset_id: AssetId,
    ) -> EvalResult<Amount> {
        if amount == 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        self.require_signature(&index.owner)?;

        let existing = self.pending.get_order(kind, index);
        let mut rec = if amount > 0 {
            let mut rec = existing.unwrap_or_else(|| OrderRecord::new(0, self.now));
            self.sub_balance(Asset::new(amount, asset_id))?;
            rec.balance = rec.balance.checked_add(amount).ok_or(EvalError::Overflow)?;
            rec.last_update = self.now;
            rec
        } else {
            let mut rec = existing.ok_or(EvalError::UnknownOrder(*index))?;
            let release = amount.checked_neg().ok_or(EvalError::Overflow)?;
            if release > rec.balance {
                return Err(EvalError::InsufficientOrderBalance {
                    available: rec.balance,
                    requested: release,
                });
            }
            self.add_balance(Asset::new(release, asset_id))?;
            rec.balance -= release;
            rec
        };

        if rec.is_null() {
            rec = OrderRecord::default();
        }
        self.pending.store_order(kind, *index, rec);
        trace!(?kind, %amount, price = %index.order_price, "order adjusted");
        Ok(amount)
    }

    fn update_depth(&mut self, pair: MarketPair, bid_delta: Amount, ask_delta: Amount) {
        let mut status = self
            .pending
            .get_market_status(pair)
            .unwrap_or_else(|| MarketStatus::new(pair));
        status.bid_depth = (status.bid_depth + bid_delta).max(0);
        status.ask_depth = (status.ask_depth + ask_delta).max(0);
        self.pending.store_market_status(status);
        self.pending.mark_market_dirty(pair);
    }

    /// Credits a signature balance of the key's owner outside the scratch
    /// balances.
    fn credit_owner(&mut self, key: &MarketIndexKey, amount: Asset) {
        if amount.amount <= 0 {
            return;
        }
        let cond = WithdrawCondition::signature(key.owner, amount.asset_id);
        let mut rec = self
            .pending
            .get_balance(&cond.balance_id())
            .unwrap_or_else(|| BalanceRecord::empty(cond));
        rec.deposit(amount.amount, self.now);
        self.pending.store_balance(rec);
    }
}

#[cfg(test)]
mod tests {
    use dexchain_ledger::{LedgerView, LedgerViewExt};
    use dexchain_market::{call_price, ruleset_for_version};
    use dexchain_params::constants::{MAX_SHORT_APR_BPS, MINIMUM_SHORT_ORDER_SIZE};
    use dexchain_primitives::{amount::Amount, ids::AssetId, price::Price};
    use dexchain_state::{
        market::{CollateralRecord, MarketIndexKey, MarketPair, OrderKind},
        operation::Operation,
    };
    use dexchain_test_utils::{
        ledger::{add_market_asset, add_user_asset, fund},
        tx::{deposit, withdraw},
    };

    use crate::{errors::EvalError, test_support::*};

    fn usd_market() -> (Fixture, MarketPair) {
        let mut f = Fixture::new();
        let usd = add_market_asset(&mut f.store, "USD");
        (f, MarketPair::new(usd, AssetId::BASE))
    }

    fn key(pair: MarketPair, num: u128, den: u128, owner: u8) -> MarketIndexKey {
        let price = Price::from_fraction(num, den, pair.quote_id, pair.base_id).unwrap();
        MarketIndexKey::new(price, address(owner))
    }

    fn depth(f: &Fixture, pair: MarketPair) -> (Amount, Amount) {
        f.store
            .get_market_status(pair)
            .map_or((0, 0), |s| (s.bid_depth, s.ask_depth))
    }

    /// Opens a position for alice directly in the store: 200 base backing
    /// 100 quote, with the quote in alice's balance.
    fn open_position(f: &mut Fixture, pair: MarketPair) -> MarketIndexKey {
        let rs = ruleset_for_version(7);
        let price = call_price(pair, 100, 200, rs).unwrap();
        let key = MarketIndexKey::new(price, address(ALICE));
        f.store.store_collateral(
            key,
            CollateralRecord {
                collateral_balance: 200,
                payoff_balance: 100,
                interest_apr_bps: 1_000,
                opened: f.store.now(),
                expiration: None,
            },
        );
        fund(&mut f.store, address(ALICE), pair.quote_id, 100);
        key
    }

    #[test]
    fn test_ask_escrows_and_cancels() {
        let (mut f, pair) = usd_market();
        let index = key(pair, 3, 2, ALICE);
        let ask = |amount| Operation::Ask { amount, index };

        f.apply(vec![pay(ALICE, 400), ask(400)], &[ALICE]).unwrap();
        assert_eq!(f.balance(ALICE, AssetId::BASE), FUNDS - 400);
        assert_eq!(f.store.get_order(OrderKind::Ask, &index).unwrap().balance, 400);
        assert_eq!(depth(&f, pair), (0, 400));
        assert!(f.store.dirty_markets().contains(&pair));

        let res = f.apply(vec![ask(-401)], &[ALICE]);
        assert!(matches!(res, Err(EvalError::InsufficientOrderBalance { .. })));

        let back = deposit(address(ALICE), AssetId::BASE, 400);
        f.apply(vec![ask(-400), back], &[ALICE]).unwrap();
        assert!(f.store.get_order(OrderKind::Ask, &index).is_none());
        assert_eq!(f.balance(ALICE, AssetId::BASE), FUNDS);
        assert_eq!(depth(&f, pair), (0, 0));
    }

    #[test]
    fn test_bid_escrows_quote() {
        let (mut f, pair) = usd_market();
        fund(&mut f.store, address(ALICE), pair.quote_id, 50);
        let index = key(pair, 1, 1, ALICE);
        let ops = vec![
            withdraw(address(ALICE), pair.quote_id, 50),
            Operation::Bid { amount: 50, index },
        ];
        f.apply(ops, &[ALICE]).unwrap();
        assert_eq!(f.balance(ALICE, pair.quote_id), 0);
        assert_eq!(depth(&f, pair), (50, 0));

        // only the owner touches an order
        let res = f.apply(vec![Operation::Bid { amount: -10, index }], &[DELEGATE]);
        assert_eq!(res.unwrap_err(), EvalError::MissingSignature);
    }

    #[test]
    fn test_order_market_checks() {
        let (mut f, pair) = usd_market();
        let same = MarketIndexKey::new(
            Price::from_fraction(1, 1, AssetId::BASE, AssetId::BASE).unwrap(),
            address(ALICE),
        );
        let op = Operation::Ask {
            amount: 1,
            index: same,
        };
        let res = f.apply(vec![pay(ALICE, 1), op], &[ALICE]);
        assert_eq!(res.unwrap_err(), EvalError::InvalidMarket(AssetId::BASE));

        let zero = MarketIndexKey::new(pair.min_price(), address(ALICE));
        let op = Operation::Ask {
            amount: 1,
            index: zero,
        };
        let res = f.apply(vec![pay(ALICE, 1), op], &[ALICE]);
        assert_eq!(res.unwrap_err(), EvalError::ZeroPrice);
    }

    #[test]
    fn test_short_rules() {
        let (mut f, pair) = usd_market();
        let index = key(pair, 1, 1, ALICE);
        let short = |amount, apr| Operation::Short {
            amount,
            index,
            interest_apr_bps: apr,
            limit_price: None,
        };

        let res = f.apply(vec![pay(ALICE, 10), short(10, 500)], &[ALICE]);
        assert_eq!(res.unwrap_err(), EvalError::ShortTooSmall(10));

        let size = MINIMUM_SHORT_ORDER_SIZE;
        let res = f.apply(vec![pay(ALICE, size), short(size, MAX_SHORT_APR_BPS + 1)], &[ALICE]);
        assert_eq!(res.unwrap_err(), EvalError::AprTooHigh(MAX_SHORT_APR_BPS + 1));

        f.apply(vec![pay(ALICE, size), short(size, 500)], &[ALICE])
            .unwrap();
        let rec = f.store.get_order(OrderKind::Short, &index).unwrap();
        assert_eq!(rec.balance, MINIMUM_SHORT_ORDER_SIZE);
        assert_eq!(rec.interest_apr_bps, 500);
        assert_eq!(depth(&f, pair), (MINIMUM_SHORT_ORDER_SIZE, 0));

        // user issued assets cannot be shorted
        let gold = add_user_asset(&mut f.store, "GLD", f.alice);
        let gold_index = key(MarketPair::new(gold, AssetId::BASE), 1, 1, ALICE);
        let op = Operation::Short {
            amount: MINIMUM_SHORT_ORDER_SIZE,
            index: gold_index,
            interest_apr_bps: 0,
            limit_price: None,
        };
        let res = f.apply(vec![pay(ALICE, MINIMUM_SHORT_ORDER_SIZE), op], &[ALICE]);
        assert_eq!(res.unwrap_err(), EvalError::NotMarketIssued(gold));
    }

    #[test]
    fn test_partial_cover_rekeys() {
        let (mut f, pair) = usd_market();
        let old = open_position(&mut f, pair);
        let ops = vec![
            withdraw(address(ALICE), pair.quote_id, 40),
            Operation::Cover {
                amount: 40,
                cover_index: old,
            },
        ];
        f.apply(ops, &[ALICE]).unwrap();

        assert!(f.store.get_collateral(&old).is_none());
        let positions = f.store.market_collateral(pair);
        assert_eq!(positions.len(), 1);
        let (new_key, rec) = &positions[0];
        assert_eq!(rec.payoff_balance, 60);
        assert_eq!(rec.collateral_balance, 200);
        assert!(new_key.order_price < old.order_price);
        assert_eq!(f.supply(pair.quote_id), 60);
    }

    #[test]
    fn test_full_cover_releases_collateral() {
        let (mut f, pair) = usd_market();
        let index = open_position(&mut f, pair);
        let ops = vec![
            withdraw(address(ALICE), pair.quote_id, 100),
            Operation::Cover {
                amount: 100,
                cover_index: index,
            },
        ];
        f.apply(ops, &[ALICE]).unwrap();

        assert!(f.store.market_collateral(pair).is_empty());
        assert_eq!(f.balance(ALICE, AssetId::BASE), FUNDS + 200);
        assert_eq!(f.supply(pair.quote_id), 0);
    }

    #[test]
    fn test_cover_over_debt_rejected() {
        let (mut f, pair) = usd_market();
        let index = open_position(&mut f, pair);
        fund(&mut f.store, address(ALICE), pair.quote_id, 10);
        let ops = vec![
            withdraw(address(ALICE), pair.quote_id, 110),
            Operation::Cover {
                amount: 110,
                cover_index: index,
            },
        ];
        let res = f.apply(ops, &[ALICE]);
        assert_eq!(
            res.unwrap_err(),
            EvalError::InsufficientOrderBalance {
                available: 100,
                requested: 110
            }
        );
    }

    #[test]
    fn test_add_collateral_lowers_call_price() {
        let (mut f, pair) = usd_market();
        let old = open_position(&mut f, pair);
        let ops = vec![
            pay(DELEGATE, 100),
            Operation::AddCollateral {
                amount: 100,
                cover_index: old,
            },
        ];
        f.apply(ops, &[DELEGATE]).unwrap();

        let positions = f.store.market_collateral(pair);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].1.collateral_balance, 300);
        assert!(positions[0].0.order_price < old.order_price);
        assert_eq!(positions[0].0.owner, address(ALICE));
    }
}
