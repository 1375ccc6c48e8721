use std::collections::VecDeque;

use dexchain_ledger::{LedgerView, LedgerViewExt, PendingState};
use dexchain_params::ChainParams;
use dexchain_primitives::{
    address::Address,
    amount::{Amount, Asset},
    price::Price,
    time::Timestamp,
};
use dexchain_state::{
    asset::AssetRecord,
    balance::{BalanceRecord, WithdrawCondition},
    market::{
        CollateralRecord, MarketIndexKey, MarketPair, MarketStatus, MarketTransaction, Order,
        OrderKind,
    },
};
use tracing::*;

use crate::{
    collateral::{call_price, rekey_collateral},
    errors::{MarketError, MarketResult},
    feed::active_feed_price,
    history::{next_center_price, update_market_history, FillStats},
    interest::{interest_owed, interest_paid},
    ruleset::{ruleset_for_version, MarketRuleset, ShortPriceCap},
};

/// Matches the order book of one market per run.
#[derive(Debug)]
pub struct MarketEngine<'r> {
    ruleset: &'r MarketRuleset,
    min_feeds: u32,
    center_window: u32,
}

impl<'r> MarketEngine<'r> {
    pub fn new(ruleset: &'r MarketRuleset, params: &ChainParams) -> Self {
        Self {
            ruleset,
            min_feeds: params.min_feeds,
            center_window: params.blocks_per_hour(),
        }
    }

    pub fn ruleset(&self) -> &MarketRuleset {
        self.ruleset
    }

    /// Runs the market for `pair` on a nested overlay over `view`.  On
    /// failure the run's writes are dropped and the error is recorded in
    /// the market status instead.
    pub fn execute<V: LedgerView>(
        &self,
        view: &mut V,
        pair: MarketPair,
    ) -> MarketResult<Vec<MarketTransaction>> {
        let mut pending = PendingState::new(&mut *view);
        let res = MarketRun::load(self, &mut pending, pair).and_then(|run| run.match_orders());
        match res {
            Ok(fills) => {
                pending.apply_changes();
                Ok(fills)
            }
            Err(e) => {
                drop(pending);
                let mut status = view
                    .get_market_status(pair)
                    .unwrap_or_else(|| MarketStatus::new(pair));
                status.last_error = Some(e.to_string());
                view.store_market_status(status);
                Err(e)
            }
        }
    }
}

/// Runs every dirty market with the ruleset in force at `block_num`, then
/// clears the dirty set.  Failed markets are logged and skipped.
pub fn execute_dirty_markets<V: LedgerView>(
    view: &mut V,
    params: &ChainParams,
    block_num: u32,
) -> Vec<MarketTransaction> {
    let ruleset = ruleset_for_version(params.market_version_at(block_num));
    let engine = MarketEngine::new(ruleset, params);

    let mut fills = Vec::new();
    for pair in view.dirty_markets() {
        match engine.execute(view, pair) {
            Ok(f) => {
                if !f.is_empty() {
                    debug!(?pair, fills = f.len(), version = ruleset.version, "market matched");
                }
                fills.extend(f);
            }
            Err(e) => warn!(?pair, %e, "market run failed"),
        }
    }
    view.clear_dirty_markets();
    fills
}

#[derive(Copy, Clone, Debug)]
enum BidSide {
    Bid,
    Short,
}

#[derive(Copy, Clone, Debug)]
enum AskSide {
    Ask,
    Call(usize),
}

/// Working state of one market run.
struct MarketRun<'e, V: LedgerView> {
    ruleset: &'e MarketRuleset,
    center_window: u32,
    view: V,
    pair: MarketPair,
    now: Timestamp,
    quote: AssetRecord,
    base: AssetRecord,
    status: MarketStatus,
    feed: Option<Price>,

    /// Highest price first.
    bids: VecDeque<Order>,
    /// Eligible shorts with their execution price, highest first.
    shorts: VecDeque<(Price, Order)>,
    /// Lowest price first.
    asks: VecDeque<Order>,
    /// Highest call price first.
    calls: Vec<(MarketIndexKey, CollateralRecord)>,

    fills: Vec<MarketTransaction>,
    stats: FillStats,
}

impl<'e, V: LedgerView> MarketRun<'e, V> {
    fn load(engine: &'e MarketEngine<'_>, view: V, pair: MarketPair) -> MarketResult<Self> {
        let ruleset = engine.ruleset;
        let quote = view
            .get_asset(pair.quote_id)
            .ok_or(MarketError::UnknownAsset(pair.quote_id))?;
        let base = view
            .get_asset(pair.base_id)
            .ok_or(MarketError::UnknownAsset(pair.base_id))?;
        let status = view
            .get_market_status(pair)
            .unwrap_or_else(|| MarketStatus::new(pair));

        let margin_market = quote.is_market_issued() && pair.base_id.is_base();
        let mut feed = None;
        if margin_market && ruleset.uses_feed() {
            feed = active_feed_price(&view, pair.quote_id, engine.min_feeds)
                .or(status.current_feed_price);
            if feed.is_none() {
                return Err(MarketError::InsufficientFeeds(pair));
            }
        }

        let mut bids: Vec<Order> = view.market_orders(OrderKind::Bid, pair);
        bids.sort_by(|a, b| b.price().cmp(&a.price()).then(a.owner().cmp(&b.owner())));
        let asks = view.market_orders(OrderKind::Ask, pair);

        let mut calls = Vec::new();
        if margin_market {
            calls = view.market_collateral(pair);
            calls.reverse();
        }

        let now = view.now();
        let mut run = Self {
            ruleset,
            center_window: engine.center_window,
            view,
            pair,
            now,
            quote,
            base,
            status,
            feed,
            bids: bids.into(),
            shorts: VecDeque::new(),
            asks: asks.into(),
            calls,
            fills: Vec::new(),
            stats: FillStats::default(),
        };
        if margin_market {
            run.load_shorts()?;
        }
        Ok(run)
    }

    /// Cancels undersized shorts and queues the eligible ones at their
    /// execution price.
    fn load_shorts(&mut self) -> MarketResult<()> {
        let mut shorts = Vec::new();
        for order in self.view.market_orders(OrderKind::Short, self.pair) {
            if order.balance() < self.ruleset.min_short_order {
                self.cancel_short(order);
                continue;
            }
            if let Some(exec) = self.short_execution_price(&order)? {
                shorts.push((exec, order));
            }
        }
        shorts.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.key.cmp(&b.1.key)));
        self.shorts = shorts.into();
        Ok(())
    }

    fn short_execution_price(&self, order: &Order) -> MarketResult<Option<Price>> {
        let own = order.price();
        let exec = match self.ruleset.short_cap {
            ShortPriceCap::CenterPrice => self.status.center_price.map(|c| own.min(c)),
            ShortPriceCap::FeedMultiple { num, den } => match self.feed {
                Some(feed) => Some(own.min(feed.scale(num, den)?)),
                None => None,
            },
            ShortPriceCap::Feed => match (self.feed, order.record.limit_price) {
                (Some(feed), Some(limit)) if feed > limit => None,
                (feed, _) => feed,
            },
        };
        Ok(exec.filter(|p| !p.is_zero()))
    }

    fn match_orders(mut self) -> MarketResult<Vec<MarketTransaction>> {
        while let Some((bid_side, bid_price)) = self.best_bid() {
            let ask_side = match self.next_call(bid_price)? {
                Some(i) => AskSide::Call(i),
                None => match self.asks.front() {
                    Some(ask) if ask.price() <= bid_price => AskSide::Ask,
                    _ => break,
                },
            };

            let before = self.book_state();
            self.fill(bid_side, bid_price, ask_side)?;
            if self.book_state() == before {
                return Err(MarketError::Stalled);
            }
        }
        self.finish()
    }

    /// Queue lengths and front balances.  Every matching step changes it.
    fn book_state(&self) -> [Amount; 8] {
        [
            self.bids.len() as Amount,
            self.shorts.len() as Amount,
            self.asks.len() as Amount,
            self.calls.len() as Amount,
            self.bids.front().map_or(0, Order::balance),
            self.shorts.front().map_or(0, |(_, o)| o.balance()),
            self.asks.front().map_or(0, Order::balance),
            self.calls.iter().map(|(_, c)| c.collateral_balance).sum(),
        ]
    }

    /// Best of the top bid and the top short.  Ties go to the bid.
    fn best_bid(&self) -> Option<(BidSide, Price)> {
        let bid = self.bids.front().map(|o| o.price());
        let short = self.shorts.front().map(|(p, _)| *p);
        match (bid, short) {
            (Some(b), Some(s)) if s > b => Some((BidSide::Short, s)),
            (Some(b), _) => Some((BidSide::Bid, b)),
            (None, Some(s)) => Some((BidSide::Short, s)),
            (None, None) => None,
        }
    }

    /// First position that is called at `bid_price` and whose collateral
    /// can buy back its debt at that price.
    fn next_call(&self, bid_price: Price) -> MarketResult<Option<usize>> {
        for (i, (key, rec)) in self.calls.iter().enumerate() {
            let call = key.order_price;
            let expired = rec.expiration.is_some_and(|e| e <= self.now);
            let trigger = if self.ruleset.calls_against_bid() {
                Some(bid_price)
            } else {
                self.feed
            };
            let called = expired || trigger.is_some_and(|t| t <= call);
            if !called {
                continue;
            }
            let debt = self.debt(rec);
            if bid_price.quote_for(rec.collateral_balance)? < debt {
                continue;
            }
            return Ok(Some(i));
        }
        Ok(None)
    }

    fn debt(&self, rec: &CollateralRecord) -> Amount {
        if !self.ruleset.charges_interest {
            return rec.payoff_balance;
        }
        let age = self.now.secs_since(rec.opened);
        rec.payoff_balance + interest_owed(rec.payoff_balance, rec.interest_apr_bps, age)
    }

    /// One matching step.  Either fills both sides or drops an exhausted
    /// order.
    fn fill(&mut self, bid_side: BidSide, bid_price: Price, ask_side: AskSide) -> MarketResult<()> {
        let bid = match bid_side {
            BidSide::Bid => self.bids.front().cloned(),
            BidSide::Short => self.shorts.front().map(|(_, o)| o.clone()),
        }
        .ok_or(MarketError::Stalled)?;

        let (ask_price, ask_owner, ask_updated) = match ask_side {
            AskSide::Ask => {
                let ask = self.asks.front().ok_or(MarketError::Stalled)?;
                (ask.price(), ask.owner(), Some(ask.record.last_update))
            }
            AskSide::Call(i) => (self.calls[i].0.order_price, self.calls[i].0.owner, None),
        };

        // margin calls fill at the bid, otherwise the earlier order sets the
        // price with ties going to the ask
        let fill_price = match ask_updated {
            None => bid_price,
            Some(ask_t) if bid.record.last_update < ask_t => bid_price,
            Some(_) => ask_price,
        };

        let bid_cap = match bid_side {
            BidSide::Bid => bid.price().base_for(bid.balance())?,
            BidSide::Short => bid.balance(),
        };
        let ask_cap = match ask_side {
            AskSide::Ask => self.asks.front().map_or(0, |o| o.balance()),
            AskSide::Call(i) => {
                let rec = &self.calls[i].1;
                rec.collateral_balance
                    .min(fill_price.base_for_ceil(self.debt(rec))?)
            }
        };

        if bid_cap <= 0 {
            self.drop_bid(bid_side);
            return Ok(());
        }
        if ask_cap <= 0 {
            match ask_side {
                AskSide::Ask => self.drop_ask(),
                AskSide::Call(i) => {
                    self.settle_call(i)?;
                }
            }
            return Ok(());
        }

        let base = bid_cap.min(ask_cap);
        let mut quote = fill_price.quote_for(base)?;
        if let AskSide::Call(i) = ask_side {
            quote = quote.min(self.debt(&self.calls[i].1));
        }

        // the smaller side is not worth a single quote unit at this price
        if quote == 0 {
            if base == ask_cap {
                match ask_side {
                    AskSide::Ask => self.drop_ask(),
                    AskSide::Call(i) => {
                        self.settle_call(i)?;
                    }
                }
            } else {
                self.drop_bid(bid_side);
            }
            return Ok(());
        }

        let mut mtrx = MarketTransaction {
            bid_kind: bid.kind,
            ask_kind: match ask_side {
                AskSide::Ask => OrderKind::Ask,
                AskSide::Call(_) => OrderKind::Cover,
            },
            bid_owner: bid.owner(),
            ask_owner,
            bid_price,
            ask_price,
            fill_price,
            bid_paid: Asset::new(quote, self.pair.quote_id),
            bid_received: Asset::new(base, self.pair.base_id),
            ask_paid: Asset::new(base, self.pair.base_id),
            ask_received: Asset::new(quote, self.pair.quote_id),
            quote_fees: 0,
            base_fees: 0,
        };

        match bid_side {
            BidSide::Bid => self.pay_bid(base, quote, base == bid_cap)?,
            BidSide::Short => self.pay_short(base, quote)?,
        }
        match ask_side {
            AskSide::Ask => self.pay_ask(base, quote),
            AskSide::Call(i) => self.pay_call(i, base, quote, &mut mtrx)?,
        }

        trace!(
            bid = ?mtrx.bid_owner,
            ask = ?mtrx.ask_owner,
            ?fill_price,
            base,
            quote,
            "fill"
        );
        self.stats.record(bid_price, ask_price, fill_price, base, quote);
        self.fills.push(mtrx);
        Ok(())
    }

    // ===== Bid side =====

    fn pay_bid(&mut self, base: Amount, quote: Amount, exhausted: bool) -> MarketResult<()> {
        let Some(bid) = self.bids.front_mut() else {
            return Err(MarketError::Stalled);
        };
        let committed = if exhausted {
            bid.record.balance
        } else {
            bid.price().quote_for(base)?.min(bid.record.balance)
        };
        let refund = committed - quote;
        if refund < 0 {
            return Err(MarketError::NegativeBalance("bid refund"));
        }
        bid.record.balance -= committed;
        let (key, rec) = (bid.key, bid.record.clone());
        self.view.store_order(OrderKind::Bid, key, rec.clone());

        self.credit(key.owner, Asset::new(base, self.pair.base_id));
        self.credit(key.owner, Asset::new(refund, self.pair.quote_id));
        if rec.is_null() || key.order_price.base_for(rec.balance)? == 0 {
            self.drop_bid(BidSide::Bid);
        }
        Ok(())
    }

    /// Issues `quote` against the short's escrow and opens a position
    /// backed by the escrow plus the purchased base.
    fn pay_short(&mut self, base: Amount, quote: Amount) -> MarketResult<()> {
        let Some((_, short)) = self.shorts.front_mut() else {
            return Err(MarketError::Stalled);
        };
        short.record.balance -= base;
        if short.record.balance < 0 {
            return Err(MarketError::NegativeBalance("short escrow"));
        }
        let owner = short.owner();
        let apr = short.record.interest_apr_bps;
        let (key, rec) = (short.key, short.record.clone());
        self.view.store_order(OrderKind::Short, key, rec.clone());

        self.quote.current_share_supply = self
            .quote
            .current_share_supply
            .checked_add(quote)
            .filter(|s| *s <= self.quote.maximum_share_supply)
            .ok_or(MarketError::SupplyOverflow(self.quote.id))?;

        let position = CollateralRecord {
            collateral_balance: base * 2,
            payoff_balance: quote,
            interest_apr_bps: apr,
            opened: self.now,
            expiration: self
                .ruleset
                .short_period_sec
                .map(|secs| self.now.saturating_add_secs(secs)),
        };
        self.open_position(owner, position)?;

        if rec.balance == 0 {
            self.shorts.pop_front();
        } else if rec.balance < self.ruleset.min_short_order {
            if let Some((_, order)) = self.shorts.pop_front() {
                self.cancel_short(order);
            }
        }
        Ok(())
    }

    /// Indexes a new position at its call price, merging into one the owner
    /// already has there.
    fn open_position(&mut self, owner: Address, position: CollateralRecord) -> MarketResult<()> {
        let price = call_price(
            self.pair,
            position.payoff_balance,
            position.collateral_balance,
            self.ruleset,
        )?;
        let key = MarketIndexKey::new(price, owner);
        let merged = match self.view.get_collateral(&key) {
            Some(mut existing) => {
                existing.collateral_balance += position.collateral_balance;
                existing.payoff_balance += position.payoff_balance;
                existing
            }
            None => position,
        };
        self.view.store_collateral(key, merged);
        self.track_call(key);
        Ok(())
    }

    fn drop_bid(&mut self, side: BidSide) {
        match side {
            BidSide::Bid => {
                if let Some(mut bid) = self.bids.pop_front() {
                    let dust = bid.record.balance;
                    bid.record.balance = 0;
                    self.view.store_order(OrderKind::Bid, bid.key, bid.record);
                    self.credit(bid.key.owner, Asset::new(dust, self.pair.quote_id));
                }
            }
            BidSide::Short => {
                if let Some((_, order)) = self.shorts.pop_front() {
                    self.cancel_short(order);
                }
            }
        }
    }

    /// Removes a short and refunds its escrow.
    fn cancel_short(&mut self, mut order: Order) {
        let refund = order.record.balance;
        order.record.balance = 0;
        self.view.store_order(OrderKind::Short, order.key, order.record);
        self.credit(order.key.owner, Asset::new(refund, self.pair.base_id));
    }

    // ===== Ask side =====

    fn pay_ask(&mut self, base: Amount, quote: Amount) {
        let Some(ask) = self.asks.front_mut() else {
            return;
        };
        ask.record.balance -= base;
        let owner = ask.owner();
        let (key, rec) = (ask.key, ask.record.clone());
        self.view.store_order(OrderKind::Ask, key, rec.clone());
        self.credit(owner, Asset::new(quote, self.pair.quote_id));

        // leftovers too small to be worth a single quote unit go back
        let dust = key.order_price.quote_for(rec.balance).unwrap_or(0) == 0;
        if rec.balance == 0 || dust {
            self.drop_ask();
        }
    }

    fn drop_ask(&mut self) {
        if let Some(mut ask) = self.asks.pop_front() {
            let dust = ask.record.balance;
            ask.record.balance = 0;
            self.view.store_order(OrderKind::Ask, ask.key, ask.record);
            self.credit(ask.key.owner, Asset::new(dust, self.pair.base_id));
        }
    }

    /// Sells `base` of the position's collateral for `quote`, interest
    /// first, and re-keys or closes the position.
    fn pay_call(
        &mut self,
        i: usize,
        base: Amount,
        quote: Amount,
        mtrx: &mut MarketTransaction,
    ) -> MarketResult<()> {
        let debt = self.debt(&self.calls[i].1);
        let rec = &mut self.calls[i].1;
        let age = self.now.secs_since(rec.opened);

        let (principal, interest) = if quote >= debt {
            (rec.payoff_balance, quote - rec.payoff_balance)
        } else if self.ruleset.charges_interest {
            let interest = interest_paid(quote, rec.interest_apr_bps, age);
            (quote - interest, interest)
        } else {
            (quote, 0)
        };
        rec.payoff_balance -= principal;
        rec.collateral_balance -= base;
        if rec.collateral_balance < 0 || rec.payoff_balance < 0 {
            return Err(MarketError::NegativeBalance("position"));
        }

        self.quote.current_share_supply -= quote;
        self.quote.collected_fees += interest;
        mtrx.quote_fees = interest;

        mtrx.base_fees = self.settle_call(i)?;
        Ok(())
    }

    /// Closes a paid off or exhausted position, returning its leftover
    /// collateral minus the margin call fee, or moves it to its new call
    /// price.  Returns the fee charged.
    fn settle_call(&mut self, i: usize) -> MarketResult<Amount> {
        let (key, rec) = self.calls[i].clone();
        let mut fee = 0;

        if rec.payoff_balance == 0 || rec.collateral_balance == 0 {
            let expired = rec.expiration.is_some_and(|e| e <= self.now);
            let leftover = rec.collateral_balance;
            if leftover > 0 {
                if !expired {
                    fee = leftover * self.ruleset.margin_call_fee_bps as Amount / 10_000;
                }
                self.base.collected_fees += fee;
                self.base.current_share_supply -= fee;
                self.credit(key.owner, Asset::new(leftover - fee, self.pair.base_id));
            }
            if rec.payoff_balance > 0 {
                warn!(
                    owner = ?key.owner,
                    debt = rec.payoff_balance,
                    "position closed with unpaid debt"
                );
            }
            rekey_collateral(&mut self.view, &key, CollateralRecord::default(), self.ruleset)?;
            self.calls.remove(i);
            return Ok(fee);
        }

        self.calls.remove(i);
        if let Some(new_key) = rekey_collateral(&mut self.view, &key, rec, self.ruleset)? {
            self.track_call(new_key);
        }
        Ok(fee)
    }

    /// Puts the position stored at `key` back into the call queue in order.
    fn track_call(&mut self, key: MarketIndexKey) {
        self.calls.retain(|(k, _)| *k != key);
        if let Some(rec) = self.view.get_collateral(&key) {
            let at = self
                .calls
                .iter()
                .position(|(k, _)| *k < key)
                .unwrap_or(self.calls.len());
            self.calls.insert(at, (key, rec));
        }
    }

    fn credit(&mut self, owner: Address, amount: Asset) {
        if amount.amount <= 0 {
            return;
        }
        let cond = WithdrawCondition::signature(owner, amount.asset_id);
        let mut rec = self
            .view
            .get_balance(&cond.balance_id())
            .unwrap_or_else(|| BalanceRecord::empty(cond));
        rec.deposit(amount.amount, self.now);
        self.view.store_balance(rec);
    }

    // ===== Statistics =====

    fn finish(mut self) -> MarketResult<Vec<MarketTransaction>> {
        let pair = self.pair;
        let sum = |orders: Vec<Order>| orders.iter().map(Order::balance).sum::<Amount>();
        let bid_depth = sum(self.view.market_orders(OrderKind::Bid, pair))
            + sum(self.view.market_orders(OrderKind::Short, pair));
        let ask_depth = sum(self.view.market_orders(OrderKind::Ask, pair))
            + self
                .view
                .market_collateral(pair)
                .iter()
                .map(|(_, c)| c.collateral_balance)
                .sum::<Amount>();

        let mut status = self.status.clone();
        status.bid_depth = bid_depth;
        status.ask_depth = ask_depth;
        status.center_price =
            next_center_price(status.center_price, self.stats.closing_price, self.center_window);
        if self.feed.is_some() {
            status.current_feed_price = self.feed;
        }
        status.last_error = None;
        self.view.store_market_status(status);

        update_market_history(&mut self.view, pair, self.now, &self.stats);

        self.view.store_asset(self.quote.clone());
        if self.base.id != self.quote.id {
            self.view.store_asset(self.base.clone());
        }
        Ok(self.fills)
    }
}

#[cfg(test)]
mod tests {
    use dexchain_ledger::ChainStore;
    use dexchain_params::{
        constants::{MARGIN_CALL_FEE_BPS, MINIMUM_SHORT_ORDER_SIZE},
        ForkSchedule,
    };
    use dexchain_primitives::{buf::Buf20, ids::AssetId};
    use dexchain_state::{
        asset::AssetIssuer,
        market::{HistoryGranularity, MarketHistoryKey, OrderRecord},
    };

    use super::*;
    use crate::ruleset::{
        MARKET_V1, MARKET_V2, MARKET_V3, MARKET_V4, MARKET_V5, MARKET_V6, MARKET_V7,
    };

    const USD: AssetId = AssetId::new(1);
    const PAIR: MarketPair = MarketPair::new(USD, AssetId::BASE);

    fn owner(b: u8) -> Address {
        Address::new(Buf20::new([b; 20]))
    }

    fn price(num: u128, den: u128) -> Price {
        Price::from_fraction(num, den, USD, AssetId::BASE).unwrap()
    }

    fn asset(id: AssetId, issuer: AssetIssuer, supply: Amount) -> AssetRecord {
        AssetRecord {
            id,
            symbol: if id.is_base() { "DXC" } else { "USD" }.to_owned(),
            name: String::new(),
            description: String::new(),
            issuer,
            precision: 100_000,
            registration_date: Timestamp::ZERO,
            last_update: Timestamp::ZERO,
            current_share_supply: supply,
            maximum_share_supply: 1_000_000_000_000,
            collected_fees: 0,
        }
    }

    fn store(usd_issuer: AssetIssuer, usd_supply: Amount) -> ChainStore {
        let mut store = ChainStore::new();
        store.set_now(Timestamp::from_secs(100_000));
        store.store_asset(asset(AssetId::BASE, AssetIssuer::Network, 1_000_000));
        store.store_asset(asset(USD, usd_issuer, usd_supply));
        store
    }

    fn place(store: &mut ChainStore, kind: OrderKind, p: Price, who: u8, bal: Amount, at: u32) {
        let rec = OrderRecord::new(bal, Timestamp::from_secs(at));
        store.store_order(kind, MarketIndexKey::new(p, owner(who)), rec);
    }

    fn balance(store: &ChainStore, who: u8, asset_id: AssetId) -> Amount {
        let cond = WithdrawCondition::signature(owner(who), asset_id);
        store.get_balance(&cond.balance_id()).map_or(0, |b| b.balance)
    }

    fn feed_status(store: &mut ChainStore, feed: Price) {
        let mut status = MarketStatus::new(PAIR);
        status.current_feed_price = Some(feed);
        store.store_market_status(status);
    }

    /// Bid 20 quote at 2.0 against an older ask of 10 base at 1.5.
    fn crossed_book() -> ChainStore {
        let mut store = store(AssetIssuer::Account(Default::default()), 1_000);
        place(&mut store, OrderKind::Ask, price(3, 2), 2, 10, 10);
        place(&mut store, OrderKind::Bid, price(2, 1), 1, 20, 20);
        store
    }

    #[test]
    fn test_crossed_book_fills_at_maker_price() {
        let mut store = crossed_book();
        let engine = MarketEngine::new(&MARKET_V1, &ChainParams::default());
        let fills = engine.execute(&mut store, PAIR).unwrap();

        assert_eq!(fills.len(), 1);
        let fill = &fills[0];
        assert_eq!(fill.fill_price, price(3, 2));
        assert_eq!(fill.bid_paid, Asset::new(15, USD));
        assert_eq!(fill.ask_paid, Asset::new(10, AssetId::BASE));

        // bidder gets the base plus the unspent quote back
        assert_eq!(balance(&store, 1, AssetId::BASE), 10);
        assert_eq!(balance(&store, 1, USD), 5);
        assert_eq!(balance(&store, 2, USD), 15);

        assert!(store.market_orders(OrderKind::Bid, PAIR).is_empty());
        assert!(store.market_orders(OrderKind::Ask, PAIR).is_empty());
        let status = store.get_market_status(PAIR).unwrap();
        assert_eq!(status.bid_depth, 0);
        assert_eq!(status.ask_depth, 0);
        assert_eq!(status.center_price, Some(price(3, 2)));
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_runs_are_deterministic() {
        let engine = MarketEngine::new(&MARKET_V1, &ChainParams::default());
        let mut a = crossed_book();
        let mut b = crossed_book();
        assert_eq!(
            engine.execute(&mut a, PAIR).unwrap(),
            engine.execute(&mut b, PAIR).unwrap()
        );

        let key = MarketHistoryKey {
            pair: PAIR,
            granularity: HistoryGranularity::Hour,
            timestamp: Timestamp::from_secs(100_000).align_down(3_600),
        };
        let hist = a.get_market_history(&key).unwrap();
        assert_eq!(hist, b.get_market_history(&key).unwrap());
        assert_eq!(hist.base_volume, 10);
        assert_eq!(hist.quote_volume, 15);
    }

    #[test]
    fn test_uncrossed_book_leaves_orders() {
        let mut store = store(AssetIssuer::Account(Default::default()), 1_000);
        place(&mut store, OrderKind::Ask, price(3, 1), 2, 10, 10);
        place(&mut store, OrderKind::Bid, price(2, 1), 1, 20, 20);

        let engine = MarketEngine::new(&MARKET_V1, &ChainParams::default());
        assert!(engine.execute(&mut store, PAIR).unwrap().is_empty());
        let status = store.get_market_status(PAIR).unwrap();
        assert_eq!(status.bid_depth, 20);
        assert_eq!(status.ask_depth, 10);
    }

    #[test]
    fn test_short_opens_position() {
        let mut store = store(AssetIssuer::Market, 0);
        feed_status(&mut store, price(1, 1));
        let rec = OrderRecord {
            balance: 100,
            limit_price: Some(price(2, 1)),
            interest_apr_bps: 0,
            last_update: Timestamp::from_secs(10),
        };
        store.store_order(OrderKind::Short, MarketIndexKey::new(price(1, 1), owner(1)), rec);
        place(&mut store, OrderKind::Ask, price(4, 5), 2, 50, 20);

        let engine = MarketEngine::new(&MARKET_V4, &ChainParams::default());
        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].bid_kind, OrderKind::Short);
        assert_eq!(fills[0].fill_price, price(1, 1));

        let positions = store.market_collateral(PAIR);
        assert_eq!(positions.len(), 1);
        let (key, pos) = &positions[0];
        assert_eq!(key.owner, owner(1));
        assert_eq!(pos.collateral_balance, 100);
        assert_eq!(pos.payoff_balance, 50);

        assert_eq!(store.get_asset(USD).unwrap().current_share_supply, 50);
        assert_eq!(balance(&store, 2, USD), 50);

        let status = store.get_market_status(PAIR).unwrap();
        assert_eq!(status.bid_depth, 50);
        assert_eq!(status.ask_depth, 100);
    }

    #[test]
    fn test_short_above_limit_is_skipped() {
        let mut store = store(AssetIssuer::Market, 0);
        feed_status(&mut store, price(3, 1));
        let rec = OrderRecord {
            balance: 100,
            limit_price: Some(price(2, 1)),
            interest_apr_bps: 0,
            last_update: Timestamp::from_secs(10),
        };
        store.store_order(OrderKind::Short, MarketIndexKey::new(price(1, 1), owner(1)), rec);
        place(&mut store, OrderKind::Ask, price(1, 5), 2, 50, 20);

        let engine = MarketEngine::new(&MARKET_V4, &ChainParams::default());
        assert!(engine.execute(&mut store, PAIR).unwrap().is_empty());
        assert!(store.market_collateral(PAIR).is_empty());
    }

    #[test]
    fn test_margin_call_covers_debt() {
        let mut store = store(AssetIssuer::Market, 90);
        feed_status(&mut store, price(1, 1));
        let pos = CollateralRecord {
            collateral_balance: 100,
            payoff_balance: 90,
            interest_apr_bps: 0,
            opened: Timestamp::from_secs(100_000),
            expiration: None,
        };
        let call = call_price(PAIR, 90, 100, &MARKET_V4).unwrap();
        store.store_collateral(MarketIndexKey::new(call, owner(3)), pos);
        place(&mut store, OrderKind::Bid, price(6, 5), 1, 200, 20);

        let engine = MarketEngine::new(&MARKET_V4, &ChainParams::default());
        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].ask_kind, OrderKind::Cover);
        assert_eq!(fills[0].bid_received, Asset::new(75, AssetId::BASE));
        assert_eq!(fills[0].ask_received, Asset::new(90, USD));

        assert!(store.market_collateral(PAIR).is_empty());
        assert_eq!(store.get_asset(USD).unwrap().current_share_supply, 0);
        assert_eq!(balance(&store, 3, AssetId::BASE), 25);
        assert_eq!(balance(&store, 1, AssetId::BASE), 75);
        assert_eq!(store.get_market_status(PAIR).unwrap().bid_depth, 110);
    }

    #[test]
    fn test_missing_feed_is_recorded() {
        let mut store = store(AssetIssuer::Market, 0);
        place(&mut store, OrderKind::Bid, price(1, 1), 1, 20, 20);

        let engine = MarketEngine::new(&MARKET_V4, &ChainParams::default());
        let err = engine.execute(&mut store, PAIR).unwrap_err();
        assert_eq!(err, MarketError::InsufficientFeeds(PAIR));

        let status = store.get_market_status(PAIR).unwrap();
        assert!(status.last_error.is_some());
        assert_eq!(store.market_orders(OrderKind::Bid, PAIR).len(), 1);
    }

    #[test]
    fn test_dirty_markets_cleared() {
        let mut store = crossed_book();
        store.mark_market_dirty(PAIR);
        let params = ChainParams {
            forks: ForkSchedule::fixed(1),
            ..Default::default()
        };

        let fills = execute_dirty_markets(&mut store, &params, 10);
        assert_eq!(fills.len(), 1);
        assert!(store.dirty_markets().is_empty());
    }

    #[test]
    fn test_dust_ask_is_refunded_not_filled() {
        let mut store = store(AssetIssuer::Account(Default::default()), 1_000);
        // one base at 0.5 is worth nothing in whole quote units
        place(&mut store, OrderKind::Ask, price(1, 2), 2, 1, 10);
        place(&mut store, OrderKind::Bid, price(1, 1), 1, 10, 20);

        let engine = MarketEngine::new(&MARKET_V1, &ChainParams::default());
        assert!(engine.execute(&mut store, PAIR).unwrap().is_empty());

        assert_eq!(balance(&store, 2, AssetId::BASE), 1);
        assert_eq!(balance(&store, 2, USD), 0);
        assert_eq!(balance(&store, 1, AssetId::BASE), 0);
        assert!(store.market_orders(OrderKind::Ask, PAIR).is_empty());
        let bids = store.market_orders(OrderKind::Bid, PAIR);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].balance(), 10);
    }

    /// Resting short of 10 base at `own`, older than an ask of 10 base at
    /// 1.0, so one fill happens at the short's execution price.
    fn short_against_ask(own: Price) -> ChainStore {
        let mut store = store(AssetIssuer::Market, 0);
        place(&mut store, OrderKind::Short, own, 1, 10, 10);
        place(&mut store, OrderKind::Ask, price(1, 1), 2, 10, 20);
        store
    }

    #[test]
    fn test_short_capped_by_feed_multiple() {
        let cases = [
            (&MARKET_V2, price(2, 1), price(10, 9), 11),
            (&MARKET_V3, price(2, 1), price(4, 3), 13),
            (&MARKET_V3, price(6, 5), price(6, 5), 12),
        ];
        for (ruleset, own, expected, quote) in cases {
            let mut store = short_against_ask(own);
            feed_status(&mut store, price(1, 1));

            let engine = MarketEngine::new(ruleset, &ChainParams::default());
            let fills = engine.execute(&mut store, PAIR).unwrap();
            assert_eq!(fills.len(), 1, "v{}", ruleset.version);
            assert_eq!(fills[0].fill_price, expected, "v{}", ruleset.version);
            assert_eq!(fills[0].bid_paid, Asset::new(quote, USD));
            assert_eq!(balance(&store, 2, USD), quote);

            let positions = store.market_collateral(PAIR);
            assert_eq!(positions[0].1.collateral_balance, 20);
            assert_eq!(positions[0].1.payoff_balance, quote);
        }
    }

    #[test]
    fn test_short_needs_center_price_before_v2() {
        let mut store = short_against_ask(price(2, 1));
        let engine = MarketEngine::new(&MARKET_V1, &ChainParams::default());
        assert!(engine.execute(&mut store, PAIR).unwrap().is_empty());
        assert_eq!(store.market_orders(OrderKind::Short, PAIR).len(), 1);

        let mut status = store.get_market_status(PAIR).unwrap();
        status.center_price = Some(price(3, 2));
        store.store_market_status(status);

        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].fill_price, price(3, 2));
        assert_eq!(fills[0].bid_paid, Asset::new(15, USD));
    }

    /// Position of 100 base collateral owing 50, call price 0.75 under the
    /// 2/3 ratio, and a bid of 200 quote at 1.0.
    fn position_and_bid(feed: Price, expiration: Timestamp) -> ChainStore {
        let mut store = store(AssetIssuer::Market, 50);
        feed_status(&mut store, feed);
        let pos = CollateralRecord {
            collateral_balance: 100,
            payoff_balance: 50,
            interest_apr_bps: 0,
            opened: Timestamp::from_secs(100_000),
            expiration: Some(expiration),
        };
        let call = call_price(PAIR, 50, 100, &MARKET_V5).unwrap();
        store.store_collateral(MarketIndexKey::new(call, owner(3)), pos);
        place(&mut store, OrderKind::Bid, price(1, 1), 1, 200, 20);
        store
    }

    #[test]
    fn test_expired_position_called_above_feed() {
        let engine = MarketEngine::new(&MARKET_V5, &ChainParams::default());

        let future = Timestamp::from_secs(200_000);
        let mut store = position_and_bid(price(1, 1), future);
        assert!(engine.execute(&mut store, PAIR).unwrap().is_empty());
        assert_eq!(store.market_collateral(PAIR).len(), 1);

        let past = Timestamp::from_secs(99_999);
        let mut store = position_and_bid(price(1, 1), past);
        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].ask_kind, OrderKind::Cover);
        assert_eq!(fills[0].ask_received, Asset::new(50, USD));
        assert!(store.market_collateral(PAIR).is_empty());
        assert_eq!(balance(&store, 1, AssetId::BASE), 50);
        assert_eq!(balance(&store, 3, AssetId::BASE), 50);
        assert_eq!(store.get_asset(USD).unwrap().current_share_supply, 0);
    }

    #[test]
    fn test_undersized_short_cancelled_from_v6() {
        let small = MINIMUM_SHORT_ORDER_SIZE - 1;
        let setup = || {
            let mut store = store(AssetIssuer::Market, 0);
            feed_status(&mut store, price(1, 1));
            place(&mut store, OrderKind::Short, price(1, 1), 1, small, 10);
            store
        };

        let mut store = setup();
        let engine = MarketEngine::new(&MARKET_V5, &ChainParams::default());
        engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(store.market_orders(OrderKind::Short, PAIR).len(), 1);

        let mut store = setup();
        let engine = MarketEngine::new(&MARKET_V6, &ChainParams::default());
        engine.execute(&mut store, PAIR).unwrap();
        assert!(store.market_orders(OrderKind::Short, PAIR).is_empty());
        assert_eq!(balance(&store, 1, AssetId::BASE), small);
        assert_eq!(store.get_market_status(PAIR).unwrap().bid_depth, 0);
    }

    #[test]
    fn test_margin_call_fee_only_before_expiration() {
        let engine = MarketEngine::new(&MARKET_V7, &ChainParams::default());
        let fee = 50 * MARGIN_CALL_FEE_BPS as Amount / 10_000;
        assert!(fee > 0);

        // called by the feed while still running
        let mut store = position_and_bid(price(1, 2), Timestamp::from_secs(200_000));
        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills[0].base_fees, fee);
        assert_eq!(balance(&store, 3, AssetId::BASE), 50 - fee);
        let base = store.get_asset(AssetId::BASE).unwrap();
        assert_eq!(base.collected_fees, fee);
        assert_eq!(base.current_share_supply, 1_000_000 - fee);

        let mut store = position_and_bid(price(1, 2), Timestamp::from_secs(99_999));
        let fills = engine.execute(&mut store, PAIR).unwrap();
        assert_eq!(fills[0].base_fees, 0);
        assert_eq!(balance(&store, 3, AssetId::BASE), 50);
        assert_eq!(store.get_asset(AssetId::BASE).unwrap().collected_fees, 0);
    }
}
