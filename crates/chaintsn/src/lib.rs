//! Transaction evaluation.
//!
//! A [`TransactionEvaluationState`] runs every operation of a transaction on
//! a disposable overlay, then settles scratch balances into fees, checks
//! conditional deposits and the size fee, and tallies delegate votes.  Only
//! a transaction that passes all of it reaches the parent view.

mod errors;
mod evaluator;
mod ops;

#[cfg(test)]
mod test_support;

pub use errors::{EvalError, EvalResult};
pub use evaluator::{evaluate_transaction, TransactionEvaluationState};
