use dexchain_ledger::{LedgerView, LedgerViewExt};
use dexchain_params::constants::MAX_FEED_AGE_SEC;
use dexchain_primitives::{ids::AssetId, price::Price};
use dexchain_state::feed::median_price;

/// Median of the fresh feeds published by active delegates for `quote_id`,
/// or `None` with fewer than `min_feeds` of them.
pub fn active_feed_price<V: LedgerView + ?Sized>(
    view: &V,
    quote_id: AssetId,
    min_feeds: u32,
) -> Option<Price> {
    let now = view.now();
    let active = view.active_delegates();
    let prices: Vec<Price> = view
        .feeds_for_quote(quote_id)
        .into_iter()
        .filter(|f| active.contains(&f.index.delegate_id))
        .filter(|f| now.secs_since(f.last_update) <= MAX_FEED_AGE_SEC)
        .filter(|f| f.value.quote_id == quote_id && f.value.base_id == AssetId::BASE)
        .map(|f| f.value)
        .collect();

    if prices.len() < min_feeds.max(1) as usize {
        return None;
    }
    median_price(prices)
}

#[cfg(test)]
mod tests {
    use dexchain_ledger::ChainStore;
    use dexchain_primitives::{ids::AccountId, time::Timestamp};
    use dexchain_state::feed::{FeedIndex, FeedRecord};

    use super::*;

    const USD: AssetId = AssetId::new(1);

    fn feed(delegate: u32, ratio: u128, at: u32) -> FeedRecord {
        FeedRecord {
            index: FeedIndex {
                quote_id: USD,
                delegate_id: AccountId::new(delegate),
            },
            value: Price::new(ratio, USD, AssetId::BASE),
            last_update: Timestamp::from_secs(at),
        }
    }

    fn store_with_feeds() -> ChainStore {
        let mut store = ChainStore::new();
        store.set_now(Timestamp::from_secs(MAX_FEED_AGE_SEC + 1_000));
        store.set_active_delegates((1..=4).map(AccountId::new).collect());
        store.store_feed(feed(1, 10, 1_000));
        store.store_feed(feed(2, 30, 1_000));
        store.store_feed(feed(3, 20, 1_000));
        // stale
        store.store_feed(feed(4, 99, 10));
        // not an active delegate
        store.store_feed(feed(9, 99, 1_000));
        store
    }

    #[test]
    fn test_median_of_fresh_active_feeds() {
        let store = store_with_feeds();
        let price = active_feed_price(&store, USD, 3).unwrap();
        assert_eq!(price.ratio, 20);
    }

    #[test]
    fn test_too_few_feeds() {
        let store = store_with_feeds();
        assert!(active_feed_price(&store, USD, 4).is_none());
        assert!(active_feed_price(&store, AssetId::new(2), 1).is_none());
    }
}
