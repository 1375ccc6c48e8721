//! Copy on write overlay.

use std::collections::BTreeMap;

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
use tracing::*;

use crate::{delta::StateDelta, view::LedgerView};

const MIN_OWNER: Address = Address::new(Buf20::zero());
const MAX_OWNER: Address = Address::new(Buf20::new([0xff; 20]));

/// Speculative overlay over a parent view.
///
/// Reads check the local delta first and fall through to the parent on a
/// miss.  Writes only touch the local delta until [`Self::apply_changes`]
/// pushes them down.  Dropping the overlay discards them.
#[derive(Debug)]
pub struct PendingState<P: LedgerView> {
    parent: P,
    now: Option<Timestamp>,
    delta: StateDelta,
}

impl<P: LedgerView> PendingState<P> {
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            now: None,
            delta: StateDelta::default(),
        }
    }

    /// Overlay whose clock reads `now` instead of the parent's.
    pub fn with_now(parent: P, now: Timestamp) -> Self {
        Self {
            parent,
            now: Some(now),
            delta: StateDelta::default(),
        }
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn delta(&self) -> &StateDelta {
        &self.delta
    }

    pub fn into_delta(self) -> StateDelta {
        self.delta
    }

    /// Pushes every local write into the parent and returns it.
    pub fn apply_changes(mut self) -> P {
        trace!(writes = self.delta.len(), "applying overlay to parent");
        self.delta.apply_to(&mut self.parent);
        self.parent
    }

    /// Delta that restores the parent's current values for every key this
    /// overlay touched.
    ///
    /// Keys the parent does not have become explicit removals.  For balances
    /// that is an empty record carrying the condition, since a balance id
    /// alone cannot be turned back into a record.  Orders and collateral get
    /// null records.
    pub fn get_undo_state(&self) -> StateDelta {
        let p = &self.parent;
        let mut undo = StateDelta::default();

        for id in self.delta.properties.keys() {
            undo.properties.insert(*id, p.get_property(*id));
        }
        for id in self.delta.accounts.keys() {
            undo.accounts.insert(*id, p.get_account(*id));
        }
        for id in self.delta.assets.keys() {
            undo.assets.insert(*id, p.get_asset(*id));
        }
        for id in self.delta.slates.keys() {
            undo.slates.insert(*id, p.get_slate(*id));
        }
        for (id, rec) in &self.delta.balances {
            let prior = p
                .get_balance(id)
                .unwrap_or_else(|| BalanceRecord::empty(rec.condition.clone()));
            undo.balances.insert(*id, prior);
        }
        for id in self.delta.transactions.keys() {
            undo.transactions.insert(*id, p.get_transaction(id));
        }
        for index in self.delta.feeds.keys() {
            undo.feeds.insert(*index, p.get_feed(index));
        }
        for (kind, key) in self.delta.orders.keys() {
            let prior = p.get_order(*kind, key).unwrap_or_default();
            undo.orders.insert((*kind, *key), prior);
        }
        for key in self.delta.collateral.keys() {
            undo.collateral.insert(*key, p.get_collateral(key).unwrap_or_default());
        }
        for pair in self.delta.market_statuses.keys() {
            undo.market_statuses.insert(*pair, p.get_market_status(*pair));
        }
        for key in self.delta.market_history.keys() {
            undo.market_history.insert(*key, p.get_market_history(key));
        }

        undo
    }
}

impl<P: LedgerView> LedgerView for PendingState<P> {
    fn now(&self) -> Timestamp {
        self.now.unwrap_or_else(|| self.parent.now())
    }

    // ===== Chain properties =====

    fn get_property(&self, id: PropertyId) -> Option<PropertyValue> {
        match self.delta.properties.get(&id) {
            Some(v) => v.clone(),
            None => self.parent.get_property(id),
        }
    }

    fn set_property(&mut self, id: PropertyId, value: PropertyValue) {
        self.delta.properties.insert(id, Some(value));
    }

    fn remove_property(&mut self, id: PropertyId) {
        self.delta.properties.insert(id, None);
    }

    // ===== Accounts =====

    fn get_account(&self, id: AccountId) -> Option<AccountRecord> {
        match self.delta.accounts.get(&id) {
            Some(rec) => rec.clone(),
            None => self.parent.get_account(id),
        }
    }

    fn get_account_by_name(&self, name: &str) -> Option<AccountRecord> {
        let local = self.delta.accounts.values().flatten().find(|a| a.name == name);
        if let Some(rec) = local {
            return Some(rec.clone());
        }
        // the parent's answer may be stale if we touched that id
        let rec = self.parent.get_account_by_name(name)?;
        match self.delta.accounts.get(&rec.id) {
            Some(local) => local.clone().filter(|a| a.name == name),
            None => Some(rec),
        }
    }

    fn get_account_by_address(&self, addr: &Address) -> Option<AccountRecord> {
        let local = self.delta.accounts.values().flatten().find(|a| {
            a.owner_address() == *addr
                || a.active_key_history
                    .values()
                    .any(|k| !k.is_null() && k.address() == *addr)
        });
        if let Some(rec) = local {
            return Some(rec.clone());
        }
        let rec = self.parent.get_account_by_address(addr)?;
        match self.delta.accounts.get(&rec.id) {
            // touched locally and no longer matching
            Some(_) => None,
            None => Some(rec),
        }
    }

    fn store_account(&mut self, rec: AccountRecord) {
        self.delta.accounts.insert(rec.id, Some(rec));
    }

    fn remove_account(&mut self, id: AccountId) {
        self.delta.accounts.insert(id, None);
    }

    fn delegate_accounts(&self) -> Vec<AccountRecord> {
        let mut merged: BTreeMap<AccountId, AccountRecord> = self
            .parent
            .delegate_accounts()
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        for (id, rec) in &self.delta.accounts {
            match rec {
                Some(a) if a.is_delegate() => {
                    merged.insert(*id, a.clone());
                }
                _ => {
                    merged.remove(id);
                }
            }
        }
        merged.into_values().collect()
    }

    // ===== Assets =====

    fn get_asset(&self, id: AssetId) -> Option<AssetRecord> {
        match self.delta.assets.get(&id) {
            Some(rec) => rec.clone(),
            None => self.parent.get_asset(id),
        }
    }

    fn get_asset_by_symbol(&self, symbol: &str) -> Option<AssetRecord> {
        let local = self.delta.assets.values().flatten().find(|a| a.symbol == symbol);
        if let Some(rec) = local {
            return Some(rec.clone());
        }
        let rec = self.parent.get_asset_by_symbol(symbol)?;
        match self.delta.assets.get(&rec.id) {
            Some(local) => local.clone().filter(|a| a.symbol == symbol),
            None => Some(rec),
        }
    }

    fn store_asset(&mut self, rec: AssetRecord) {
        self.delta.assets.insert(rec.id, Some(rec));
    }

    fn remove_asset(&mut self, id: AssetId) {
        self.delta.assets.insert(id, None);
    }

    // ===== Balances =====

    fn get_balance(&self, id: &BalanceId) -> Option<BalanceRecord> {
        match self.delta.balances.get(id) {
            Some(rec) if rec.is_empty() => None,
            Some(rec) => Some(rec.clone()),
            None => self.parent.get_balance(id),
        }
    }

    fn store_balance(&mut self, rec: BalanceRecord) {
        self.delta.balances.insert(rec.id(), rec);
    }

    // ===== Slates =====

    fn get_slate(&self, id: SlateId) -> Option<SlateRecord> {
        match self.delta.slates.get(&id) {
            Some(rec) => rec.clone(),
            None => self.parent.get_slate(id),
        }
    }

    fn store_slate(&mut self, rec: SlateRecord) {
        self.delta.slates.insert(rec.id, Some(rec));
    }

    fn remove_slate(&mut self, id: SlateId) {
        self.delta.slates.insert(id, None);
    }

    // ===== Transactions =====

    fn get_transaction(&self, id: &TxId) -> Option<TransactionRecord> {
        match self.delta.transactions.get(id) {
            Some(rec) => rec.clone(),
            None => self.parent.get_transaction(id),
        }
    }

    fn store_transaction(&mut self, rec: TransactionRecord) {
        self.delta.transactions.insert(rec.id, Some(rec));
    }

    fn remove_transaction(&mut self, id: &TxId) {
        self.delta.transactions.insert(*id, None);
    }

    // ===== Feeds =====

    fn get_feed(&self, index: &FeedIndex) -> Option<FeedRecord> {
        match self.delta.feeds.get(index) {
            Some(rec) => rec.clone(),
            None => self.parent.get_feed(index),
        }
    }

    fn store_feed(&mut self, rec: FeedRecord) {
        self.delta.feeds.insert(rec.index, Some(rec));
    }

    fn remove_feed(&mut self, index: &FeedIndex) {
        self.delta.feeds.insert(*index, None);
    }

    fn feeds_for_quote(&self, quote_id: AssetId) -> Vec<FeedRecord> {
        let mut merged: BTreeMap<FeedIndex, FeedRecord> = self
            .parent
            .feeds_for_quote(quote_id)
            .into_iter()
            .map(|f| (f.index, f))
            .collect();
        for (index, rec) in &self.delta.feeds {
            if index.quote_id != quote_id {
                continue;
            }
            match rec {
                Some(f) => {
                    merged.insert(*index, f.clone());
                }
                None => {
                    merged.remove(index);
                }
            }
        }
        merged.into_values().collect()
    }

    // ===== Orders =====

    fn get_order(&self, kind: OrderKind, key: &MarketIndexKey) -> Option<OrderRecord> {
        match self.delta.orders.get(&(kind, *key)) {
            Some(rec) if rec.is_null() => None,
            Some(rec) => Some(rec.clone()),
            None => self.parent.get_order(kind, key),
        }
    }

    fn store_order(&mut self, kind: OrderKind, key: MarketIndexKey, rec: OrderRecord) {
        self.delta.orders.insert((kind, key), rec);
    }

    fn market_orders(&self, kind: OrderKind, pair: MarketPair) -> Vec<Order> {
        let mut merged: BTreeMap<MarketIndexKey, OrderRecord> = self
            .parent
            .market_orders(kind, pair)
            .into_iter()
            .map(|o| (o.key, o.record))
            .collect();
        let lo = (kind, MarketIndexKey::new(pair.min_price(), MIN_OWNER));
        let hi = (kind, MarketIndexKey::new(pair.max_price(), MAX_OWNER));
        for ((_, key), rec) in self.delta.orders.range(lo..=hi) {
            if rec.is_null() {
                merged.remove(key);
            } else {
                merged.insert(*key, rec.clone());
            }
        }
        merged
            .into_iter()
            .map(|(key, record)| Order::new(kind, key, record))
            .collect()
    }

    // ===== Collateral =====

    fn get_collateral(&self, key: &MarketIndexKey) -> Option<CollateralRecord> {
        match self.delta.collateral.get(key) {
            Some(rec) if rec.is_null() => None,
            Some(rec) => Some(rec.clone()),
            None => self.parent.get_collateral(key),
        }
    }

    fn store_collateral(&mut self, key: MarketIndexKey, rec: CollateralRecord) {
        self.delta.collateral.insert(key, rec);
    }

    fn market_collateral(&self, pair: MarketPair) -> Vec<(MarketIndexKey, CollateralRecord)> {
        let mut merged: BTreeMap<MarketIndexKey, CollateralRecord> =
            self.parent.market_collateral(pair).into_iter().collect();
        let lo = MarketIndexKey::new(pair.min_price(), MIN_OWNER);
        let hi = MarketIndexKey::new(pair.max_price(), MAX_OWNER);
        for (key, rec) in self.delta.collateral.range(lo..=hi) {
            if rec.is_null() {
                merged.remove(key);
            } else {
                merged.insert(*key, rec.clone());
            }
        }
        merged.into_iter().collect()
    }

    // ===== Market statistics =====

    fn get_market_status(&self, pair: MarketPair) -> Option<MarketStatus> {
        match self.delta.market_statuses.get(&pair) {
            Some(rec) => rec.clone(),
            None => self.parent.get_market_status(pair),
        }
    }

    fn store_market_status(&mut self, rec: MarketStatus) {
        self.delta.market_statuses.insert(rec.pair, Some(rec));
    }

    fn remove_market_status(&mut self, pair: MarketPair) {
        self.delta.market_statuses.insert(pair, None);
    }

    fn get_market_history(&self, key: &MarketHistoryKey) -> Option<MarketHistoryRecord> {
        match self.delta.market_history.get(key) {
            Some(rec) => rec.clone(),
            None => self.parent.get_market_history(key),
        }
    }

    fn store_market_history(&mut self, key: MarketHistoryKey, rec: MarketHistoryRecord) {
        self.delta.market_history.insert(key, Some(rec));
    }

    fn remove_market_history(&mut self, key: &MarketHistoryKey) {
        self.delta.market_history.insert(*key, None);
    }

    // ===== Recent operations =====

    fn recent_operations(&self, kind: OperationKind) -> Vec<Operation> {
        match self.delta.recent_operations.get(&kind) {
            Some(ops) => ops.clone(),
            None => self.parent.recent_operations(kind),
        }
    }

    fn store_recent_operation(&mut self, op: Operation) {
        let kind = op.kind();
        let mut ops = self.recent_operations(kind);
        ops.push(op);
        self.set_recent_operations(kind, ops);
    }

    fn set_recent_operations(&mut self, kind: OperationKind, mut ops: Vec<Operation>) {
        let excess = ops.len().saturating_sub(RECENT_OPERATIONS_LEN);
        ops.drain(..excess);
        self.delta.recent_operations.insert(kind, ops);
    }
}
