//! Order book, collateral and market statistics records.

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    address::Address,
    amount::{Amount, Asset},
    ids::AssetId,
    price::Price,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// A `(quote, base)` trading pair.  Prices in the market are quote units
/// per base unit.
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
pub struct MarketPair {
    pub quote_id: AssetId,
    pub base_id: AssetId,
}

impl MarketPair {
    pub const fn new(quote_id: AssetId, base_id: AssetId) -> Self {
        Self { quote_id, base_id }
    }

    pub fn of(price: &Price) -> Self {
        Self::new(price.quote_id, price.base_id)
    }

    pub fn min_price(&self) -> Price {
        Price::min_in(self.quote_id, self.base_id)
    }

    pub fn max_price(&self) -> Price {
        Price::max_in(self.quote_id, self.base_id)
    }
}

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
pub enum OrderKind {
    Bid,
    Ask,
    Short,
    /// Margin position.  Only appears in fills, positions are stored as
    /// collateral records.
    Cover,
}

/// Order book key.  Sorts by market, then price, then owner.
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
pub struct MarketIndexKey {
    pub order_price: Price,
    pub owner: Address,
}

impl MarketIndexKey {
    pub fn new(order_price: Price, owner: Address) -> Self {
        Self { order_price, owner }
    }

    pub fn market(&self) -> MarketPair {
        MarketPair::of(&self.order_price)
    }
}

#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize,
)]
pub struct OrderRecord {
    /// Escrowed funds: quote for bids, base for asks and shorts.
    pub balance: Amount,
    /// Shorts only, highest feed price the short will execute at.
    pub limit_price: Option<Price>,
    /// Shorts only, interest charged on the issued quote.
    pub interest_apr_bps: u32,
    pub last_update: Timestamp,
}

impl OrderRecord {
    pub fn new(balance: Amount, last_update: Timestamp) -> Self {
        Self {
            balance,
            last_update,
            ..Default::default()
        }
    }

    /// Null orders are removed from the book when stored.
    pub fn is_null(&self) -> bool {
        self.balance == 0
    }
}

/// An order together with its book position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub kind: OrderKind,
    pub key: MarketIndexKey,
    pub record: OrderRecord,
}

impl Order {
    pub fn new(kind: OrderKind, key: MarketIndexKey, record: OrderRecord) -> Self {
        Self { kind, key, record }
    }

    pub fn price(&self) -> Price {
        self.key.order_price
    }

    pub fn owner(&self) -> Address {
        self.key.owner
    }

    pub fn balance(&self) -> Amount {
        self.record.balance
    }

    pub fn market(&self) -> MarketPair {
        self.key.market()
    }
}

/// Margin position of a short, keyed by its call price.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize,
)]
pub struct CollateralRecord {
    /// Base asset backing the position.
    pub collateral_balance: Amount,
    /// Quote asset owed to close the position.
    pub payoff_balance: Amount,
    pub interest_apr_bps: u32,
    pub opened: Timestamp,
    pub expiration: Option<Timestamp>,
}

impl CollateralRecord {
    pub fn is_null(&self) -> bool {
        self.collateral_balance == 0 && self.payoff_balance == 0
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct MarketStatus {
    pub pair: MarketPair,
    /// Buy side escrow: quote in bids plus base in shorts.
    pub bid_depth: Amount,
    /// Sell side escrow: base in asks plus position collateral.
    pub ask_depth: Amount,
    /// Moving average of recent closing prices.
    pub center_price: Option<Price>,
    pub current_feed_price: Option<Price>,
    pub last_error: Option<String>,
}

impl MarketStatus {
    pub fn new(pair: MarketPair) -> Self {
        Self {
            pair,
            bid_depth: 0,
            ask_depth: 0,
            center_price: None,
            current_feed_price: None,
            last_error: None,
        }
    }
}

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
pub enum HistoryGranularity {
    Block,
    Hour,
    Day,
}

impl HistoryGranularity {
    pub const ALL: [HistoryGranularity; 3] = [Self::Block, Self::Hour, Self::Day];

    /// Bucket length in seconds, `None` for per block buckets.
    pub fn bucket_secs(&self) -> Option<u32> {
        match self {
            Self::Block => None,
            Self::Hour => Some(60 * 60),
            Self::Day => Some(60 * 60 * 24),
        }
    }
}

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
pub struct MarketHistoryKey {
    pub pair: MarketPair,
    pub granularity: HistoryGranularity,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct MarketHistoryRecord {
    pub highest_bid: Price,
    pub lowest_ask: Price,
    pub opening_price: Price,
    pub closing_price: Price,
    pub base_volume: Amount,
    pub quote_volume: Amount,
}

/// One fill produced by the market engine.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct MarketTransaction {
    pub bid_kind: OrderKind,
    pub ask_kind: OrderKind,
    pub bid_owner: Address,
    pub ask_owner: Address,
    pub bid_price: Price,
    pub ask_price: Price,
    pub fill_price: Price,
    /// Quote paid by the bid side.
    pub bid_paid: Asset,
    /// Base received by the bid side.
    pub bid_received: Asset,
    /// Base paid by the ask side.
    pub ask_paid: Asset,
    /// Quote received by the ask side.
    pub ask_received: Asset,
    /// Interest kept by the network, in quote.
    pub quote_fees: Amount,
    /// Margin call fee kept by the network, in base.
    pub base_fees: Amount,
}
