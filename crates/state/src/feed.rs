use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    ids::{AccountId, AssetId},
    price::Price,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshDeserialize,
    BorshSerialize,
    Deserialize,
    Serialize,
)]
pub struct FeedIndex {
    pub quote_id: AssetId,
    pub delegate_id: AccountId,
}

/// A delegate's published price for a market-issued asset.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct FeedRecord {
    pub index: FeedIndex,
    pub value: Price,
    pub last_update: Timestamp,
}

/// Median of the given feed prices, the upper one for even counts.
pub fn median_price(mut prices: Vec<Price>) -> Option<Price> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_unstable();
    Some(prices[prices.len() / 2])
}
