//! Fixtures shared by the ledger crates' tests: deterministic keys, funded
//! stores, transaction builders and genesis descriptions.

pub mod genesis;
pub mod keys;
pub mod ledger;
pub mod tx;
