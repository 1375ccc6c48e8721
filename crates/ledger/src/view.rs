use dexchain_primitives::{
    address::Address,
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

/// Read/write access to ledger entities.
///
/// Reads are infallible, a missing entity is `None`.  Balances, orders and
/// collateral have no remove method: storing an empty balance or a null
/// order/collateral record removes it.
pub trait LedgerView {
    /// Timestamp of the block being applied, or of the head block.
    fn now(&self) -> Timestamp;

    // ===== Chain properties =====

    fn get_property(&self, id: PropertyId) -> Option<PropertyValue>;

    fn set_property(&mut self, id: PropertyId, value: PropertyValue);

    fn remove_property(&mut self, id: PropertyId);

    // ===== Accounts =====

    fn get_account(&self, id: AccountId) -> Option<AccountRecord>;

    fn get_account_by_name(&self, name: &str) -> Option<AccountRecord>;

    /// Looks an account up by the address of its owner key or any active key
    /// it ever had.
    fn get_account_by_address(&self, addr: &Address) -> Option<AccountRecord>;

    fn store_account(&mut self, rec: AccountRecord);

    fn remove_account(&mut self, id: AccountId);

    /// All delegate accounts, ordered by id.
    fn delegate_accounts(&self) -> Vec<AccountRecord>;

    // ===== Assets =====

    fn get_asset(&self, id: AssetId) -> Option<AssetRecord>;

    fn get_asset_by_symbol(&self, symbol: &str) -> Option<AssetRecord>;

    fn store_asset(&mut self, rec: AssetRecord);

    fn remove_asset(&mut self, id: AssetId);

    // ===== Balances =====

    fn get_balance(&self, id: &BalanceId) -> Option<BalanceRecord>;

    fn store_balance(&mut self, rec: BalanceRecord);

    // ===== Slates =====

    fn get_slate(&self, id: SlateId) -> Option<SlateRecord>;

    fn store_slate(&mut self, rec: SlateRecord);

    fn remove_slate(&mut self, id: SlateId);

    // ===== Transactions =====

    fn get_transaction(&self, id: &TxId) -> Option<TransactionRecord>;

    fn store_transaction(&mut self, rec: TransactionRecord);

    fn remove_transaction(&mut self, id: &TxId);

    // ===== Feeds =====

    fn get_feed(&self, index: &FeedIndex) -> Option<FeedRecord>;

    fn store_feed(&mut self, rec: FeedRecord);

    fn remove_feed(&mut self, index: &FeedIndex);

    /// Feeds published for `quote_id`, ordered by delegate id.
    fn feeds_for_quote(&self, quote_id: AssetId) -> Vec<FeedRecord>;

    // ===== Orders =====

    fn get_order(&self, kind: OrderKind, key: &MarketIndexKey) -> Option<OrderRecord>;

    fn store_order(&mut self, kind: OrderKind, key: MarketIndexKey, rec: OrderRecord);

    /// Orders of one kind in a market, ascending by price then owner.
    fn market_orders(&self, kind: OrderKind, pair: MarketPair) -> Vec<Order>;

    // ===== Collateral =====

    fn get_collateral(&self, key: &MarketIndexKey) -> Option<CollateralRecord>;

    fn store_collateral(&mut self, key: MarketIndexKey, rec: CollateralRecord);

    /// Positions in a market, ascending by call price then owner.
    fn market_collateral(&self, pair: MarketPair) -> Vec<(MarketIndexKey, CollateralRecord)>;

    // ===== Market statistics =====

    fn get_market_status(&self, pair: MarketPair) -> Option<MarketStatus>;

    fn store_market_status(&mut self, rec: MarketStatus);

    fn remove_market_status(&mut self, pair: MarketPair);

    fn get_market_history(&self, key: &MarketHistoryKey) -> Option<MarketHistoryRecord>;

    fn store_market_history(&mut self, key: MarketHistoryKey, rec: MarketHistoryRecord);

    fn remove_market_history(&mut self, key: &MarketHistoryKey);

    // ===== Recent operations =====

    /// Most recent operations of a kind, oldest first.  Bookkeeping only,
    /// never undone.
    fn recent_operations(&self, kind: OperationKind) -> Vec<Operation>;

    fn store_recent_operation(&mut self, op: Operation);

    /// Replaces the buffer of `kind`, keeping the newest entries if `ops`
    /// is longer than the ring.
    fn set_recent_operations(&mut self, kind: OperationKind, ops: Vec<Operation>);
}

impl<V: LedgerView + ?Sized> LedgerView for &mut V {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn get_property(&self, id: PropertyId) -> Option<PropertyValue> {
        (**self).get_property(id)
    }

    fn set_property(&mut self, id: PropertyId, value: PropertyValue) {
        (**self).set_property(id, value)
    }

    fn remove_property(&mut self, id: PropertyId) {
        (**self).remove_property(id)
    }

    fn get_account(&self, id: AccountId) -> Option<AccountRecord> {
        (**self).get_account(id)
    }

    fn get_account_by_name(&self, name: &str) -> Option<AccountRecord> {
        (**self).get_account_by_name(name)
    }

    fn get_account_by_address(&self, addr: &Address) -> Option<AccountRecord> {
        (**self).get_account_by_address(addr)
    }

    fn store_account(&mut self, rec: AccountRecord) {
        (**self).store_account(rec)
    }

    fn remove_account(&mut self, id: AccountId) {
        (**self).remove_account(id)
    }

    fn delegate_accounts(&self) -> Vec<AccountRecord> {
        (**self).delegate_accounts()
    }

    fn get_asset(&self, id: AssetId) -> Option<AssetRecord> {
        (**self).get_asset(id)
    }

    fn get_asset_by_symbol(&self, symbol: &str) -> Option<AssetRecord> {
        (**self).get_asset_by_symbol(symbol)
    }

    fn store_asset(&mut self, rec: AssetRecord) {
        (**self).store_asset(rec)
    }

    fn remove_asset(&mut self, id: AssetId) {
        (**self).remove_asset(id)
    }

    fn get_balance(&self, id: &BalanceId) -> Option<BalanceRecord> {
        (**self).get_balance(id)
    }

    fn store_balance(&mut self, rec: BalanceRecord) {
        (**self).store_balance(rec)
    }

    fn get_slate(&self, id: SlateId) -> Option<SlateRecord> {
        (**self).get_slate(id)
    }

    fn store_slate(&mut self, rec: SlateRecord) {
        (**self).store_slate(rec)
    }

    fn remove_slate(&mut self, id: SlateId) {
        (**self).remove_slate(id)
    }

    fn get_transaction(&self, id: &TxId) -> Option<TransactionRecord> {
        (**self).get_transaction(id)
    }

    fn store_transaction(&mut self, rec: TransactionRecord) {
        (**self).store_transaction(rec)
    }

    fn remove_transaction(&mut self, id: &TxId) {
        (**self).remove_transaction(id)
    }

    fn get_feed(&self, index: &FeedIndex) -> Option<FeedRecord> {
        (**self).get_feed(index)
    }

    fn store_feed(&mut self, rec: FeedRecord) {
        (**self).store_feed(rec)
    }

    fn remove_feed(&mut self, index: &FeedIndex) {
        (**self).remove_feed(index)
    }

    fn feeds_for_quote(&self, quote_id: AssetId) -> Vec<FeedRecord> {
        (**self).feeds_for_quote(quote_id)
    }

    fn get_order(&self, kind: OrderKind, key: &MarketIndexKey) -> Option<OrderRecord> {
        (**self).get_order(kind, key)
    }

    fn store_order(&mut self, kind: OrderKind, key: MarketIndexKey, rec: OrderRecord) {
        (**self).store_order(kind, key, rec)
    }

    fn market_orders(&self, kind: OrderKind, pair: MarketPair) -> Vec<Order> {
        (**self).market_orders(kind, pair)
    }

    fn get_collateral(&self, key: &MarketIndexKey) -> Option<CollateralRecord> {
        (**self).get_collateral(key)
    }

    fn store_collateral(&mut self, key: MarketIndexKey, rec: CollateralRecord) {
        (**self).store_collateral(key, rec)
    }

    fn market_collateral(&self, pair: MarketPair) -> Vec<(MarketIndexKey, CollateralRecord)> {
        (**self).market_collateral(pair)
    }

    fn get_market_status(&self, pair: MarketPair) -> Option<MarketStatus> {
        (**self).get_market_status(pair)
    }

    fn store_market_status(&mut self, rec: MarketStatus) {
        (**self).store_market_status(rec)
    }

    fn remove_market_status(&mut self, pair: MarketPair) {
        (**self).remove_market_status(pair)
    }

    fn get_market_history(&self, key: &MarketHistoryKey) -> Option<MarketHistoryRecord> {
        (**self).get_market_history(key)
    }

    fn store_market_history(&mut self, key: MarketHistoryKey, rec: MarketHistoryRecord) {
        (**self).store_market_history(key, rec)
    }

    fn remove_market_history(&mut self, key: &MarketHistoryKey) {
        (**self).remove_market_history(key)
    }

    fn recent_operations(&self, kind: OperationKind) -> Vec<Operation> {
        (**self).recent_operations(kind)
    }

    fn store_recent_operation(&mut self, op: Operation) {
        (**self).store_recent_operation(op)
    }

    fn set_recent_operations(&mut self, kind: OperationKind, ops: Vec<Operation>) {
        (**self).set_recent_operations(kind, ops)
    }
}
