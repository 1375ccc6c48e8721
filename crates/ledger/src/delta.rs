use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::ids::{AccountId, AssetId, SlateId};
use dexchain_state::{
    account::AccountRecord,
    asset::AssetRecord,
    balance::{BalanceId, BalanceRecord},
    feed::{FeedIndex, FeedRecord},
    market::{
        CollateralRecord, MarketHistoryKey, MarketHistoryRecord, MarketIndexKey, MarketPair,
        MarketStatus, OrderKind, OrderRecord,
    },
    operation::{Operation, OperationKind},
    property::{PropertyId, PropertyValue},
    slate::SlateRecord,
    transaction::{TransactionRecord, TxId},
};

use crate::view::LedgerView;

/// Set of entity writes.  `None` entries are removals.  Balances, orders and
/// collateral carry their own removal marker (zero balance, null record).
///
/// Used both for the writes of an overlay and for the undo record of a
/// block, which is the same shape with prior values in it.
#[derive(Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct StateDelta {
    pub properties: BTreeMap<PropertyId, Option<PropertyValue>>,
    pub accounts: BTreeMap<AccountId, Option<AccountRecord>>,
    pub assets: BTreeMap<AssetId, Option<AssetRecord>>,
    pub slates: BTreeMap<SlateId, Option<SlateRecord>>,
    pub balances: BTreeMap<BalanceId, BalanceRecord>,
    pub transactions: BTreeMap<TxId, Option<TransactionRecord>>,
    pub feeds: BTreeMap<FeedIndex, Option<FeedRecord>>,
    pub orders: BTreeMap<(OrderKind, MarketIndexKey), OrderRecord>,
    pub collateral: BTreeMap<MarketIndexKey, CollateralRecord>,
    pub market_statuses: BTreeMap<MarketPair, Option<MarketStatus>>,
    pub market_history: BTreeMap<MarketHistoryKey, Option<MarketHistoryRecord>>,
    /// Whole recent-operation buffer of every kind the writer touched.
    pub recent_operations: BTreeMap<OperationKind, Vec<Operation>>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.accounts.is_empty()
            && self.assets.is_empty()
            && self.slates.is_empty()
            && self.balances.is_empty()
            && self.transactions.is_empty()
            && self.feeds.is_empty()
            && self.orders.is_empty()
            && self.collateral.is_empty()
            && self.market_statuses.is_empty()
            && self.market_history.is_empty()
            && self.recent_operations.is_empty()
    }

    /// Number of entity writes, recent operations excluded.
    pub fn len(&self) -> usize {
        self.properties.len()
            + self.accounts.len()
            + self.assets.len()
            + self.slates.len()
            + self.balances.len()
            + self.transactions.len()
            + self.feeds.len()
            + self.orders.len()
            + self.collateral.len()
            + self.market_statuses.len()
            + self.market_history.len()
    }

    /// Writes every entry into `view`.  Properties go first and market
    /// history last, the same order every time, so applying a delta twice
    /// leaves the view as applying it once.
    pub fn apply_to<V: LedgerView + ?Sized>(&self, view: &mut V) {
        for (id, value) in &self.properties {
            match value {
                Some(v) => view.set_property(*id, v.clone()),
                None => view.remove_property(*id),
            }
        }
        for (id, rec) in &self.accounts {
            match rec {
                Some(r) => view.store_account(r.clone()),
                None => view.remove_account(*id),
            }
        }
        for (id, rec) in &self.assets {
            match rec {
                Some(r) => view.store_asset(r.clone()),
                None => view.remove_asset(*id),
            }
        }
        for (id, rec) in &self.slates {
            match rec {
                Some(r) => view.store_slate(r.clone()),
                None => view.remove_slate(*id),
            }
        }
        for rec in self.balances.values() {
            view.store_balance(rec.clone());
        }
        for (id, rec) in &self.transactions {
            match rec {
                Some(r) => view.store_transaction(r.clone()),
                None => view.remove_transaction(id),
            }
        }
        for (index, rec) in &self.feeds {
            match rec {
                Some(r) => view.store_feed(r.clone()),
                None => view.remove_feed(index),
            }
        }
        for ((kind, key), rec) in &self.orders {
            view.store_order(*kind, *key, rec.clone());
        }
        for (key, rec) in &self.collateral {
            view.store_collateral(*key, rec.clone());
        }
        for (pair, rec) in &self.market_statuses {
            match rec {
                Some(r) => view.store_market_status(r.clone()),
                None => view.remove_market_status(*pair),
            }
        }
        for (key, rec) in &self.market_history {
            match rec {
                Some(r) => view.store_market_history(*key, r.clone()),
                None => view.remove_market_history(key),
            }
        }
        for (kind, ops) in &self.recent_operations {
            view.set_recent_operations(*kind, ops.clone());
        }
    }
}
