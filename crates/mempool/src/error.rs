use dexchain_chaintsn::EvalError;
use dexchain_state::transaction::TxId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    #[error("transaction {0} already pending")]
    Duplicate(TxId),

    #[error("pool is full: current={current}, limit={limit}")]
    PoolFull { current: usize, limit: usize },

    #[error("transaction size {size} bytes exceeds limit {limit} bytes")]
    TransactionTooLarge { size: usize, limit: usize },

    /// The transaction does not evaluate on top of the head and the
    /// transactions already pending.
    #[error("rejected: {0}")]
    Rejected(#[from] EvalError),
}
