use dexchain_chaintsn::EvalError;
use dexchain_db::DbError;
use dexchain_mempool::MempoolError;
use dexchain_params::GenesisError;
use dexchain_primitives::{errors::CryptoError, ids::AccountId, time::Timestamp};
use dexchain_state::block::BlockId;
use thiserror::Error;

/// Reasons a block header is refused before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("block {got} does not follow head {head}")]
    NotSequential { got: u32, head: u32 },

    #[error("block builds on {got}, head is {head}")]
    WrongPrevious { got: BlockId, head: BlockId },

    #[error("block time {0} is not aligned to the block interval")]
    UnalignedTimestamp(Timestamp),

    #[error("block time {block} is not after head time {head}")]
    TimeInPast { block: Timestamp, head: Timestamp },

    #[error("block time {block} too far ahead of local time {now}")]
    TimeInFuture { block: Timestamp, now: Timestamp },

    #[error("transaction digest mismatch")]
    InvalidDigest,

    #[error("block of {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("no active delegates")]
    NoActiveDelegates,

    #[error("scheduled delegate {0} has no signing key")]
    NoSigningKey(AccountId),

    #[error("block not signed by scheduled delegate {0}")]
    WrongSigner(AccountId),

    #[error("revealed secret does not match delegate {0}'s commitment")]
    InvalidSecret(AccountId),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("header: {0}")]
    Header(#[from] HeaderError),

    #[error("transaction {index} of block {block_num}: {source}")]
    Transaction {
        block_num: u32,
        index: usize,
        #[source]
        source: EvalError,
    },

    #[error("block {0} was already found invalid")]
    KnownInvalid(BlockId),

    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    #[error("block {0} is not linked to the chain")]
    Unlinked(BlockId),

    /// The block fell out of the undo window, or its undo record was lost.
    #[error("no undo record for block {0}")]
    MissingUndo(BlockId),

    #[error("cannot pop the genesis state")]
    NothingToPop,

    #[error("switch to fork at {block} failed: {reason}")]
    ForkSwitchFailed {
        block: BlockId,
        reason: Box<ChainError>,
    },

    #[error("genesis: {0}")]
    Genesis(#[from] GenesisError),

    #[error("pool: {0}")]
    Pool(#[from] MempoolError),

    #[error("db: {0}")]
    Db(#[from] DbError),
}

pub type ChainResult<T> = Result<T, ChainError>;
