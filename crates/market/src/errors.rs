use dexchain_primitives::{errors::PriceError, ids::AssetId};
use dexchain_state::market::MarketPair;
use thiserror::Error;

/// Failure of one market run.  Never aborts the block, the run's writes are
/// discarded and the message lands in the market status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// Market issued asset with no feed price yet.
    #[error("insufficient feeds for market {0:?}")]
    InsufficientFeeds(MarketPair),

    #[error("price: {0}")]
    Price(#[from] PriceError),

    #[error("order balance went negative for {0}")]
    NegativeBalance(&'static str),

    #[error("share supply overflow for asset {0}")]
    SupplyOverflow(AssetId),

    #[error("matching made no progress")]
    Stalled,
}

pub type MarketResult<T> = Result<T, MarketError>;
