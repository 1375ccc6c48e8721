//! Committed in-memory ledger.

use std::{
    collections::{BTreeMap, VecDeque},
    iter,
};

use dexchain_params::constants::RECENT_OPERATIONS_LEN;
use dexchain_primitives::{
    address::Address,
    buf::Buf20,
    ids::{AccountId, AssetId, SlateId},
    time::Timestamp,
};
use dexchain_state::{
    account::AccountRecord,
    asset::AssetRecord,
    balance::{BalanceId, BalanceRecord},
    feed::{FeedIndex, FeedRecord},
    market::{
        CollateralRecord, MarketHistoryKey, MarketHistoryRecord, MarketIndexKey, MarketPair,
        MarketStatus, Order, OrderKind, OrderRecord,
    },
    operation::{Operation, OperationKind},
    property::{PropertyId, PropertyValue},
    slate::SlateRecord,
    transaction::{TransactionRecord, TxId},
};

use crate::view::LedgerView;

const MIN_OWNER: Address = Address::new(Buf20::zero());
const MAX_OWNER: Address = Address::new(Buf20::new([0xff; 20]));

/// Committed ledger state with its secondary indices.
///
/// Empty balances and null orders or collateral are never kept, storing one
/// removes the entry.
#[derive(Clone, Debug, Default)]
pub struct ChainStore {
    now: Timestamp,
    properties: BTreeMap<PropertyId, PropertyValue>,
    accounts: BTreeMap<AccountId, AccountRecord>,
    account_names: BTreeMap<String, AccountId>,
    account_addresses: BTreeMap<Address, AccountId>,
    assets: BTreeMap<AssetId, AssetRecord>,
    asset_symbols: BTreeMap<String, AssetId>,
    balances: BTreeMap<BalanceId, BalanceRecord>,
    slates: BTreeMap<SlateId, SlateRecord>,
    transactions: BTreeMap<TxId, TransactionRecord>,
    feeds: BTreeMap<FeedIndex, FeedRecord>,
    orders: BTreeMap<(OrderKind, MarketIndexKey), OrderRecord>,
    collateral: BTreeMap<MarketIndexKey, CollateralRecord>,
    market_statuses: BTreeMap<MarketPair, MarketStatus>,
    market_history: BTreeMap<MarketHistoryKey, MarketHistoryRecord>,
    recent_operations: BTreeMap<OperationKind, VecDeque<Operation>>,
}

fn account_index_addresses(rec: &AccountRecord) -> impl Iterator<Item = Address> + '_ {
    iter::once(rec.owner_address()).chain(
        rec.active_key_history
            .values()
            .filter(|k| !k.is_null())
            .map(|k| k.address()),
    )
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_now(&mut self, now: Timestamp) {
        self.now = now;
    }

    /// Compares ledger contents, ignoring the clock and the recent operation
    /// buffers.
    pub fn same_ledger(&self, other: &Self) -> bool {
        self.properties == other.properties
            && self.accounts == other.accounts
            && self.account_names == other.account_names
            && self.account_addresses == other.account_addresses
            && self.assets == other.assets
            && self.asset_symbols == other.asset_symbols
            && self.balances == other.balances
            && self.slates == other.slates
            && self.transactions == other.transactions
            && self.feeds == other.feeds
            && self.orders == other.orders
            && self.collateral == other.collateral
            && self.market_statuses == other.market_statuses
            && self.market_history == other.market_history
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountRecord> {
        self.accounts.values()
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.values()
    }

    pub fn balances(&self) -> impl Iterator<Item = &BalanceRecord> {
        self.balances.values()
    }

    fn unindex_account(&mut self, id: AccountId) {
        if let Some(old) = self.accounts.remove(&id) {
            self.account_names.remove(&old.name);
            for addr in account_index_addresses(&old) {
                if self.account_addresses.get(&addr) == Some(&id) {
                    self.account_addresses.remove(&addr);
                }
            }
        }
    }

    fn unindex_asset(&mut self, id: AssetId) {
        if let Some(old) = self.assets.remove(&id) {
            self.asset_symbols.remove(&old.symbol);
        }
    }
}

impl LedgerView for ChainStore {
    fn now(&self) -> Timestamp {
        self.now
    }

    // ===== Chain properties =====

    fn get_property(&self, id: PropertyId) -> Option<PropertyValue> {
        self.properties.get(&id).cloned()
    }

    fn set_property(&mut self, id: PropertyId, value: PropertyValue) {
        self.properties.insert(id, value);
    }

    fn remove_property(&mut self, id: PropertyId) {
        self.properties.remove(&id);
    }

    // ===== Accounts =====

    fn get_account(&self, id: AccountId) -> Option<AccountRecord> {
        self.accounts.get(&id).cloned()
    }

    fn get_account_by_name(&self, name: &str) -> Option<AccountRecord> {
        let id = self.account_names.get(name)?;
        self.get_account(*id)
    }

    fn get_account_by_address(&self, addr: &Address) -> Option<AccountRecord> {
        let id = self.account_addresses.get(addr)?;
        self.get_account(*id)
    }

    fn store_account(&mut self, rec: AccountRecord) {
        self.unindex_account(rec.id);
        self.account_names.insert(rec.name.clone(), rec.id);
        for addr in account_index_addresses(&rec) {
            self.account_addresses.insert(addr, rec.id);
        }
        self.accounts.insert(rec.id, rec);
    }

    fn remove_account(&mut self, id: AccountId) {
        self.unindex_account(id);
    }

    fn delegate_accounts(&self) -> Vec<AccountRecord> {
        self.accounts
            .values()
            .filter(|a| a.is_delegate())
            .cloned()
            .collect()
    }

    // ===== Assets =====

    fn get_asset(&self, id: AssetId) -> Option<AssetRecord> {
        self.assets.get(&id).cloned()
    }

    fn get_asset_by_symbol(&self, symbol: &str) -> Option<AssetRecord> {
        let id = self.asset_symbols.get(symbol)?;
        self.get_asset(*id)
    }

    fn store_asset(&mut self, rec: AssetRecord) {
        self.unindex_asset(rec.id);
        self.asset_symbols.insert(rec.symbol.clone(), rec.id);
        self.assets.insert(rec.id, rec);
    }

    fn remove_asset(&mut self, id: AssetId) {
        self.unindex_asset(id);
    }

    // ===== Balances =====

    fn get_balance(&self, id: &BalanceId) -> Option<BalanceRecord> {
        self.balances.get(id).cloned()
    }

    fn store_balance(&mut self, rec: BalanceRecord) {
        let id = rec.id();
        if rec.is_empty() {
            self.balances.remove(&id);
        } else {
            self.balances.insert(id, rec);
        }
    }

    // ===== Slates =====

    fn get_slate(&self, id: SlateId) -> Option<SlateRecord> {
        self.slates.get(&id).cloned()
    }

    fn store_slate(&mut self, rec: SlateRecord) {
        self.slates.insert(rec.id, rec);
    }

    fn remove_slate(&mut self, id: SlateId) {
        self.slates.remove(&id);
    }

    // ===== Transactions =====

    fn get_transaction(&self, id: &TxId) -> Option<TransactionRecord> {
        self.transactions.get(id).cloned()
    }

    fn store_transaction(&mut self, rec: TransactionRecord) {
        self.transactions.insert(rec.id, rec);
    }

    fn remove_transaction(&mut self, id: &TxId) {
        self.transactions.remove(id);
    }

    // ===== Feeds =====

    fn get_feed(&self, index: &FeedIndex) -> Option<FeedRecord> {
        self.feeds.get(index).cloned()
    }

    fn store_feed(&mut self, rec: FeedRecord) {
        self.feeds.insert(rec.index, rec);
    }

    fn remove_feed(&mut self, index: &FeedIndex) {
        self.feeds.remove(index);
    }

    fn feeds_for_quote(&self, quote_id: AssetId) -> Vec<FeedRecord> {
        let lo = FeedIndex {
            quote_id,
            delegate_id: AccountId::new(0),
        };
        let hi = FeedIndex {
            quote_id,
            delegate_id: AccountId::new(u32::MAX),
        };
        self.feeds.range(lo..=hi).map(|(_, f)| f.clone()).collect()
    }

    // ===== Orders =====

    fn get_order(&self, kind: OrderKind, key: &MarketIndexKey) -> Option<OrderRecord> {
        self.orders.get(&(kind, *key)).cloned()
    }

    fn store_order(&mut self, kind: OrderKind, key: MarketIndexKey, rec: OrderRecord) {
        if rec.is_null() {
            self.orders.remove(&(kind, key));
        } else {
            self.orders.insert((kind, key), rec);
        }
    }

    fn market_orders(&self, kind: OrderKind, pair: MarketPair) -> Vec<Order> {
        let lo = (kind, MarketIndexKey::new(pair.min_price(), MIN_OWNER));
        let hi = (kind, MarketIndexKey::new(pair.max_price(), MAX_OWNER));
        self.orders
            .range(lo..=hi)
            .map(|((kind, key), rec)| Order::new(*kind, *key, rec.clone()))
            .collect()
    }

    // ===== Collateral =====

    fn get_collateral(&self, key: &MarketIndexKey) -> Option<CollateralRecord> {
        self.collateral.get(key).cloned()
    }

    fn store_collateral(&mut self, key: MarketIndexKey, rec: CollateralRecord) {
        if rec.is_null() {
            self.collateral.remove(&key);
        } else {
            self.collateral.insert(key, rec);
        }
    }

    fn market_collateral(&self, pair: MarketPair) -> Vec<(MarketIndexKey, CollateralRecord)> {
        let lo = MarketIndexKey::new(pair.min_price(), MIN_OWNER);
        let hi = MarketIndexKey::new(pair.max_price(), MAX_OWNER);
        self.collateral
            .range(lo..=hi)
            .map(|(k, r)| (*k, r.clone()))
            .collect()
    }

    // ===== Market statistics =====

    fn get_market_status(&self, pair: MarketPair) -> Option<MarketStatus> {
        self.market_statuses.get(&pair).cloned()
    }

    fn store_market_status(&mut self, rec: MarketStatus) {
        self.market_statuses.insert(rec.pair, rec);
    }

    fn remove_market_status(&mut self, pair: MarketPair) {
        self.market_statuses.remove(&pair);
    }

    fn get_market_history(&self, key: &MarketHistoryKey) -> Option<MarketHistoryRecord> {
        self.market_history.get(key).cloned()
    }

    fn store_market_history(&mut self, key: MarketHistoryKey, rec: MarketHistoryRecord) {
        self.market_history.insert(key, rec);
    }

    fn remove_market_history(&mut self, key: &MarketHistoryKey) {
        self.market_history.remove(key);
    }

    // ===== Recent operations =====

    fn recent_operations(&self, kind: OperationKind) -> Vec<Operation> {
        self.recent_operations
            .get(&kind)
            .map(|ops| ops.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn store_recent_operation(&mut self, op: Operation) {
        let ops = self.recent_operations.entry(op.kind()).or_default();
        ops.push_back(op);
        while ops.len() > RECENT_OPERATIONS_LEN {
            ops.pop_front();
        }
    }

    fn set_recent_operations(&mut self, kind: OperationKind, ops: Vec<Operation>) {
        let excess = ops.len().saturating_sub(RECENT_OPERATIONS_LEN);
        let ops: VecDeque<Operation> = ops.into_iter().skip(excess).collect();
        if ops.is_empty() {
            self.recent_operations.remove(&kind);
        } else {
            self.recent_operations.insert(kind, ops);
        }
    }
}

#[cfg(test)]
mod tests {
    use dexchain_primitives::{buf::Buf33, keys::PublicKey, price::Price};
    use dexchain_state::balance::WithdrawCondition;

    use super::*;

    fn key(b: u8) -> PublicKey {
        let mut raw = [b; 33];
        raw[0] = 2;
        PublicKey::new(Buf33::new(raw))
    }

    fn owner(b: u8) -> Address {
        Address::new(Buf20::new([b; 20]))
    }

    #[test]
    fn test_account_indices_follow_updates() {
        let mut store = ChainStore::new();
        let t = Timestamp::from_secs(10);
        let mut acct = AccountRecord::new(AccountId::new(1), "alice".into(), key(1), key(2), t);
        store.store_account(acct.clone());

        assert_eq!(store.get_account_by_name("alice").map(|a| a.id), Some(acct.id));
        assert!(store.get_account_by_address(&key(2).address()).is_some());

        // rolling the active key back drops its address from the index
        let before = acct.clone();
        acct.set_active_key(Timestamp::from_secs(20), key(3));
        store.store_account(acct);
        assert!(store.get_account_by_address(&key(3).address()).is_some());

        store.store_account(before);
        assert!(store.get_account_by_address(&key(3).address()).is_none());
        assert!(store.get_account_by_address(&key(2).address()).is_some());

        store.remove_account(AccountId::new(1));
        assert!(store.get_account_by_name("alice").is_none());
        assert!(store.get_account_by_address(&key(1).address()).is_none());
    }

    #[test]
    fn test_zero_balance_removes() {
        let mut store = ChainStore::new();
        let cond = WithdrawCondition::signature(owner(1), AssetId::BASE);
        let mut rec = BalanceRecord::empty(cond.clone());
        rec.deposit(50, Timestamp::from_secs(1));
        store.store_balance(rec);
        assert_eq!(store.get_balance(&cond.balance_id()).map(|b| b.balance), Some(50));

        store.store_balance(BalanceRecord::empty(cond.clone()));
        assert!(store.get_balance(&cond.balance_id()).is_none());
        assert_eq!(store.balances().count(), 0);
    }

    #[test]
    fn test_market_orders_scoped_to_pair_and_kind() {
        let mut store = ChainStore::new();
        let usd = AssetId::new(1);
        let eur = AssetId::new(2);
        let pair = MarketPair::new(usd, AssetId::BASE);

        let p = |r: u128, q: AssetId| Price::new(r, q, AssetId::BASE);
        let k = |r: u128, q: AssetId, o: u8| MarketIndexKey::new(p(r, q), owner(o));
        let t = Timestamp::from_secs(1);
        store.store_order(OrderKind::Bid, k(2, usd, 1), OrderRecord::new(5, t));
        store.store_order(OrderKind::Bid, k(1, usd, 2), OrderRecord::new(5, t));
        store.store_order(OrderKind::Ask, k(3, usd, 1), OrderRecord::new(5, t));
        store.store_order(OrderKind::Bid, k(1, eur, 1), OrderRecord::new(5, t));

        let bids = store.market_orders(OrderKind::Bid, pair);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].price().ratio, 1);
        assert_eq!(bids[1].price().ratio, 2);

        store.store_order(OrderKind::Bid, k(1, usd, 2), OrderRecord::default());
        assert_eq!(store.market_orders(OrderKind::Bid, pair).len(), 1);
    }

    #[test]
    fn test_recent_operations_ring() {
        let mut store = ChainStore::new();
        for i in 0..(RECENT_OPERATIONS_LEN + 5) {
            let cond = WithdrawCondition::signature(owner(1), AssetId::BASE);
            store.store_recent_operation(Operation::deposit(i as i64, cond));
        }
        let ops = store.recent_operations(OperationKind::Deposit);
        assert_eq!(ops.len(), RECENT_OPERATIONS_LEN);
        assert!(matches!(ops[0], Operation::Deposit { amount: 5, .. }));
        assert!(store.recent_operations(OperationKind::Withdraw).is_empty());
    }
}
