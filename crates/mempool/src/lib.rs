//! Pending transaction pool.
//!
//! Holds transactions that passed evaluation on top of the chain head but
//! are not in a block yet, ordered by the base fee they pay.

mod error;
mod pool;
mod types;

pub use error::MempoolError;
pub use pool::PendingPool;
pub use types::{MempoolConfig, MempoolStats, PoolEntry, PoolOrderingKey};

pub type MempoolResult<T> = Result<T, MempoolError>;
