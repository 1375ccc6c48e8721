//! Market statistics.  Written after matching and never read by it.

use dexchain_ledger::LedgerView;
use dexchain_primitives::{amount::Amount, price::Price, time::Timestamp};
use dexchain_state::market::{
    HistoryGranularity, MarketHistoryKey, MarketHistoryRecord, MarketPair,
};

/// Price and volume summary of one market run.
#[derive(Clone, Debug, Default)]
pub(crate) struct FillStats {
    pub(crate) highest_bid: Option<Price>,
    pub(crate) lowest_ask: Option<Price>,
    pub(crate) opening_price: Option<Price>,
    pub(crate) closing_price: Option<Price>,
    pub(crate) base_volume: Amount,
    pub(crate) quote_volume: Amount,
}

impl FillStats {
    pub(crate) fn record(
        &mut self,
        bid_price: Price,
        ask_price: Price,
        fill_price: Price,
        base: Amount,
        quote: Amount,
    ) {
        self.highest_bid = Some(self.highest_bid.map_or(bid_price, |p| p.max(bid_price)));
        self.lowest_ask = Some(self.lowest_ask.map_or(ask_price, |p| p.min(ask_price)));
        self.opening_price.get_or_insert(fill_price);
        self.closing_price = Some(fill_price);
        self.base_volume += base;
        self.quote_volume += quote;
    }

    fn to_record(&self) -> Option<MarketHistoryRecord> {
        Some(MarketHistoryRecord {
            highest_bid: self.highest_bid?,
            lowest_ask: self.lowest_ask?,
            opening_price: self.opening_price?,
            closing_price: self.closing_price?,
            base_volume: self.base_volume,
            quote_volume: self.quote_volume,
        })
    }
}

/// Folds one run's fills into the block, hour and day buckets.
pub(crate) fn update_market_history<V: LedgerView + ?Sized>(
    view: &mut V,
    pair: MarketPair,
    now: Timestamp,
    stats: &FillStats,
) {
    let Some(new) = stats.to_record() else {
        return;
    };

    for granularity in HistoryGranularity::ALL {
        let timestamp = match granularity.bucket_secs() {
            Some(secs) => now.align_down(secs),
            None => now,
        };
        let key = MarketHistoryKey {
            pair,
            granularity,
            timestamp,
        };
        let merged = match view.get_market_history(&key) {
            Some(mut old) => {
                old.highest_bid = old.highest_bid.max(new.highest_bid);
                old.lowest_ask = old.lowest_ask.min(new.lowest_ask);
                old.closing_price = new.closing_price;
                old.base_volume += new.base_volume;
                old.quote_volume += new.quote_volume;
                old
            }
            None => new.clone(),
        };
        view.store_market_history(key, merged);
    }
}

/// Moving average of closing prices over `window` blocks.
pub(crate) fn next_center_price(
    current: Option<Price>,
    closing: Option<Price>,
    window: u32,
) -> Option<Price> {
    let Some(closing) = closing else {
        return current;
    };
    let Some(current) = current else {
        return Some(closing);
    };
    let window = window.max(1) as u128;
    let ratio = current
        .ratio
        .saturating_mul(window - 1)
        .saturating_add(closing.ratio)
        / window;
    Some(Price::new(ratio, closing.quote_id, closing.base_id))
}
