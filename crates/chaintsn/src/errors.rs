use dexchain_primitives::{
    amount::Amount,
    errors::{CryptoError, PriceError},
    ids::{AccountId, AssetId, SlateId},
};
use dexchain_state::{balance::BalanceId, market::MarketIndexKey, transaction::TxId};
use thiserror::Error;

/// Reasons a transaction is rejected.  Any of these discards every write the
/// transaction made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u8),

    #[error("transaction expired")]
    Expired,

    #[error("transaction expiration too far in the future")]
    ExpirationTooFar,

    #[error("duplicate transaction {0}")]
    Duplicate(TxId),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// A required signature is not among the transaction's signers.
    #[error("missing signature")]
    MissingSignature,

    #[error("insufficient funds of asset {asset_id}, short by {shortfall}")]
    InsufficientFunds { asset_id: AssetId, shortfall: Amount },

    /// An option exercise did not pay the optionor enough.
    #[error("missing required deposit of {0} in asset {1}")]
    MissingDeposit(Amount, AssetId),

    #[error("insufficient fee: paid {paid}, required {required}")]
    InsufficientFee { paid: Amount, required: Amount },

    // ===== Missing records =====
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    #[error("unknown account name {0:?}")]
    UnknownAccountName(String),

    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("unknown asset symbol {0:?}")]
    UnknownAssetSymbol(String),

    #[error("unknown balance {0}")]
    UnknownBalance(BalanceId),

    #[error("unknown slate {0}")]
    UnknownSlate(SlateId),

    #[error("unknown order {0:?}")]
    UnknownOrder(MarketIndexKey),

    #[error("unknown collateral {0:?}")]
    UnknownCollateral(MarketIndexKey),

    // ===== Accounts =====
    #[error("invalid account name {0:?}")]
    InvalidName(String),

    #[error("account name {0:?} already registered")]
    NameInUse(String),

    #[error("account {0} is retracted")]
    AccountRetracted(AccountId),

    /// Keys identify accounts and may only be used by one.
    #[error("key already in use")]
    KeyInUse,

    #[error("account {0} is not a delegate")]
    NotADelegate(AccountId),

    #[error("account {0} is not an active delegate")]
    NotActiveDelegate(AccountId),

    #[error("invalid pay rate {0}")]
    InvalidPayRate(u8),

    #[error("pay rate may not increase from {current} to {requested}")]
    PayRateIncrease { current: u8, requested: u8 },

    #[error("cannot retract delegate {0} with unclaimed pay")]
    RetractingDelegateWithPay(AccountId),

    #[error("insufficient pay balance")]
    InsufficientPay,

    // ===== Assets =====
    #[error("invalid asset symbol {0:?}")]
    InvalidSymbol(String),

    #[error("asset symbol {0:?} already registered")]
    SymbolInUse(String),

    #[error("invalid asset name")]
    InvalidAssetName,

    #[error("invalid asset description")]
    InvalidDescription,

    #[error("invalid maximum share supply {0}")]
    InvalidMaxSupply(Amount),

    #[error("invalid precision {0}")]
    InvalidPrecision(Amount),

    #[error("invalid asset issuer")]
    InvalidIssuer,

    #[error("asset {0} is not user issued")]
    NotUserIssued(AssetId),

    #[error("update changes nothing")]
    NoOpUpdate,

    #[error("asset {0} has outstanding supply")]
    SupplyNotZero(AssetId),

    #[error("issuing {0} exceeds the available supply")]
    OverIssue(Amount),

    #[error("market issued asset {0} cannot be burned")]
    MarketIssuedBurn(AssetId),

    #[error("message too long")]
    MessageTooLong,

    // ===== Balances =====
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("invalid withdraw condition")]
    InvalidCondition,

    #[error("balance {id} holds {available}, requested {requested}")]
    InsufficientBalance {
        id: BalanceId,
        available: Amount,
        requested: Amount,
    },

    #[error("wrong password")]
    InvalidPassword,

    // ===== Markets =====
    #[error("price: {0}")]
    Price(#[from] PriceError),

    #[error("no market trades asset {0} against itself")]
    InvalidMarket(AssetId),

    #[error("order price is zero")]
    ZeroPrice,

    #[error("asset {0} is not market issued")]
    NotMarketIssued(AssetId),

    #[error("interest rate {0} bps above the cap")]
    AprTooHigh(u32),

    #[error("short of {0} below the minimum order size")]
    ShortTooSmall(Amount),

    #[error("order holds {available}, requested {requested}")]
    InsufficientOrderBalance { available: Amount, requested: Amount },

    // ===== Slates and feeds =====
    #[error("invalid slate")]
    InvalidSlate,

    #[error("invalid feed")]
    InvalidFeed,

    #[error("amount overflow")]
    Overflow,
}

pub type EvalResult<T> = Result<T, EvalError>;
