use dexchain_ledger::LedgerView;
use dexchain_params::constants::MAX_SLATE_SIZE;
use dexchain_primitives::ids::AccountId;
use dexchain_state::slate::SlateRecord;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    /// Records a slate so balances can vote with it.  Defining an existing
    /// slate again is a no-op.
    pub(crate) fn evaluate_define_slate(&mut self, delegates: &[AccountId]) -> EvalResult<()> {
        if delegates.is_empty() || delegates.len() > MAX_SLATE_SIZE {
            return Err(EvalError::InvalidSlate);
        }
        for &id in delegates {
            if !self.account(id)?.is_delegate() {
                return Err(EvalError::NotADelegate(id));
            }
        }

        let slate = SlateRecord::new(delegates.to_vec());
        if self.pending.get_slate(slate.id).is_none() {
            self.pending.store_slate(slate);
        }
        Ok(())
    }
}
