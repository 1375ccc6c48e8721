pub use crate::{
    account::{AccountRecord, DelegateStats},
    asset::{AssetIssuer, AssetRecord},
    balance::{BalanceId, BalanceRecord, WithdrawCondition, WithdrawKind},
    block::{Block, BlockHeader, BlockId},
    feed::{FeedIndex, FeedRecord},
    market::{
        CollateralRecord, HistoryGranularity, MarketHistoryKey, MarketHistoryRecord,
        MarketIndexKey, MarketPair, MarketStatus, MarketTransaction, Order, OrderKind,
        OrderRecord,
    },
    operation::{Operation, OperationKind},
    property::{PropertyId, PropertyValue},
    slate::SlateRecord,
    transaction::{SignedTransaction, Transaction, TransactionLocation, TransactionRecord, TxId},
};
