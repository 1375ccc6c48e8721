//! Ledger record types and the consensus wire types that mutate them.
//!
//! Everything here is plain data.  The rules for how records change live in
//! the evaluator and market engine crates.

pub mod account;
pub mod asset;
pub mod balance;
pub mod block;
pub mod feed;
pub mod market;
pub mod operation;
pub mod prelude;
pub mod property;
pub mod slate;
pub mod transaction;
