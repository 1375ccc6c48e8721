//! Block validation and the chain state machine: applying blocks over the
//! ledger, delegate scheduling, fork choice and the pending pool.

mod apply;
mod chain;
mod clock;
mod errors;
mod fork_tracker;
mod genesis;
mod schedule;
mod shared;

#[cfg(test)]
mod test_support;

pub use chain::{ChainDatabase, ChainHead};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{ChainError, ChainResult, HeaderError};
pub use fork_tracker::BlockStatus;
pub use genesis::init_genesis_store;
pub use schedule::{next_random_seed, shuffle_delegates, signing_delegate_id, top_delegates};
pub use shared::SharedChain;
