use dexchain_ledger::LedgerView;
use dexchain_primitives::{
    amount::{Amount, Asset},
    hash::ripemd160,
};
use dexchain_state::balance::{BalanceId, BalanceRecord, WithdrawCondition, WithdrawKind};
use tracing::*;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

/// Structural checks on a condition before funds are locked under it.
fn check_condition(cond: &WithdrawCondition) -> EvalResult<()> {
    match &cond.kind {
        WithdrawKind::Signature { .. } | WithdrawKind::Password { .. } => Ok(()),
        WithdrawKind::MultiSig { required, owners } => {
            if *required == 0 || *required as usize > owners.len() {
                return Err(EvalError::InvalidCondition);
            }
            Ok(())
        }
        WithdrawKind::Option { strike_price, .. } => {
            if strike_price.is_zero() || strike_price.base_id != cond.asset_id {
                return Err(EvalError::InvalidCondition);
            }
            Ok(())
        }
    }
}

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    pub(crate) fn evaluate_deposit(
        &mut self,
        amount: Amount,
        condition: &WithdrawCondition,
    ) -> EvalResult<()> {
        if amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        self.asset(condition.asset_id)?;
        check_condition(condition)?;

        let mut condition = condition.clone();
        if condition.slate_id.is_none() && condition.asset_id.is_base() {
            condition.slate_id = self.delegate_slate_id;
        }

        self.sub_balance(Asset::new(amount, condition.asset_id))?;

        let mut rec = self
            .pending
            .get_balance(&condition.balance_id())
            .unwrap_or_else(|| BalanceRecord::empty(condition.clone()));
        rec.deposit(amount, self.now);
        self.pending.store_balance(rec);

        if let Some(owner) = condition.owner() {
            *self
                .provided_deposits
                .entry((owner, condition.asset_id))
                .or_insert(0) += amount;
        }
        if condition.is_voting() {
            self.add_vote(condition.slate_id, amount)?;
        }
        Ok(())
    }

    pub(crate) fn evaluate_withdraw(
        &mut self,
        balance_id: &BalanceId,
        amount: Amount,
        claim_input: &[u8],
    ) -> EvalResult<()> {
        if amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        let mut rec = self
            .pending
            .get_balance(balance_id)
            .ok_or(EvalError::UnknownBalance(*balance_id))?;

        self.check_claim(&rec.condition, amount, claim_input)?;

        if rec.balance < amount {
            return Err(EvalError::InsufficientBalance {
                id: *balance_id,
                available: rec.balance,
                requested: amount,
            });
        }
        rec.withdraw(amount, self.now);
        let condition = rec.condition.clone();
        self.pending.store_balance(rec);

        if condition.is_voting() {
            self.sub_vote(condition.slate_id, amount)?;
        }
        self.add_balance(Asset::new(amount, condition.asset_id))
    }

    /// Checks the spending predicate of `cond` for a withdrawal of `amount`.
    fn check_claim(
        &mut self,
        cond: &WithdrawCondition,
        amount: Amount,
        claim_input: &[u8],
    ) -> EvalResult<()> {
        match &cond.kind {
            WithdrawKind::Signature { owner } => self.require_signature(owner),

            WithdrawKind::MultiSig { required, owners } => {
                if !self.check_multisig(*required, owners) {
                    return Err(EvalError::MissingSignature);
                }
                Ok(())
            }

            WithdrawKind::Password {
                payor,
                payee,
                timeout,
                password_hash,
            } => {
                if self.now > *timeout {
                    return self.require_signature(payor);
                }
                self.require_signature(payee)?;
                if ripemd160(claim_input) != *password_hash {
                    return Err(EvalError::InvalidPassword);
                }
                Ok(())
            }

            WithdrawKind::Option {
                optionor,
                optionee,
                date,
                strike_price,
            } => {
                if self.now > *date {
                    return self.require_signature(optionor);
                }
                self.require_signature(optionee)?;

                let owed = strike_price.quote_for_ceil(amount)?;
                let slot = self
                    .required_deposits
                    .entry((*optionor, strike_price.quote_id))
                    .or_insert(0);
                *slot = slot.checked_add(owed).ok_or(EvalError::Overflow)?;
                trace!(%owed, "option exercised");
                Ok(())
            }
        }
    }
}
