//! Persistence for blocks, their undo records and the main chain index.
//!
//! Ledger state itself lives in memory; what is stored here is enough to
//! rebuild it by replaying the main chain and to pop blocks off it.

mod errors;
mod macros;
mod sled_store;
mod stubs;
mod traits;

#[cfg(test)]
mod test_suite;

pub use errors::{DbError, DbResult};
pub use sled_store::SledBlockDb;
pub use stubs::StubBlockDb;
pub use traits::BlockDatabase;
