//! Per operation evaluators, as methods on the evaluation state.

mod account;
mod asset;
mod balance;
mod feed;
mod market;
mod slate;
