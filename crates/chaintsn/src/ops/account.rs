use dexchain_ledger::{LedgerView, LedgerViewExt};
use dexchain_params::constants::MAX_NAME_DATA_SIZE;
use dexchain_primitives::{
    amount::{Amount, Asset},
    ids::{AccountId, AssetId},
    keys::PublicKey,
};
use dexchain_state::account::{
    is_valid_account_name, parent_account_name, AccountRecord, DelegateStats,
};
use tracing::*;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

const MAX_PAY_RATE: u8 = 100;

fn check_public_data(data: &Option<String>) -> EvalResult<()> {
    if data.as_ref().is_some_and(|d| d.len() > MAX_NAME_DATA_SIZE) {
        return Err(EvalError::MessageTooLong);
    }
    Ok(())
}

fn check_pay_rate(rate: u8) -> EvalResult<()> {
    if rate > MAX_PAY_RATE {
        return Err(EvalError::InvalidPayRate(rate));
    }
    Ok(())
}

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    pub(crate) fn evaluate_register_account(
        &mut self,
        name: &str,
        public_data: &Option<String>,
        owner_key: &PublicKey,
        active_key: &PublicKey,
        delegate_pay_rate: Option<u8>,
    ) -> EvalResult<()> {
        if !is_valid_account_name(name) {
            return Err(EvalError::InvalidName(name.to_owned()));
        }
        if self.pending.get_account_by_name(name).is_some() {
            return Err(EvalError::NameInUse(name.to_owned()));
        }
        check_public_data(public_data)?;

        if let Some(parent_name) = parent_account_name(name) {
            let parent = self
                .pending
                .get_account_by_name(parent_name)
                .ok_or_else(|| EvalError::UnknownAccountName(parent_name.to_owned()))?;
            if parent.is_retracted() {
                return Err(EvalError::AccountRetracted(parent.id));
            }
            if !self.account_or_any_parent_has_signed(&parent) {
                return Err(EvalError::MissingSignature);
            }
        }

        if active_key.is_null() || owner_key.is_null() {
            return Err(EvalError::KeyInUse);
        }
        if self.key_in_use(&active_key.address()) || self.key_in_use(&owner_key.address()) {
            return Err(EvalError::KeyInUse);
        }

        let id = self.pending.next_account_id();
        let mut rec = AccountRecord::new(id, name.to_owned(), *owner_key, *active_key, self.now);
        rec.public_data = public_data.clone();
        if let Some(rate) = delegate_pay_rate {
            check_pay_rate(rate)?;
            rec.delegate_info = Some(DelegateStats::new(rate, *active_key, self.block_num));
            self.required_fees += self.params.delegate_registration_fee;
        }

        debug!(%id, %name, delegate = rec.is_delegate(), "registered account");
        self.store_account(rec);
        Ok(())
    }

    pub(crate) fn evaluate_update_account(
        &mut self,
        account_id: AccountId,
        public_data: &Option<String>,
        active_key: Option<&PublicKey>,
        delegate_pay_rate: Option<u8>,
    ) -> EvalResult<()> {
        let mut rec = self.account(account_id)?;
        if rec.is_retracted() {
            return Err(EvalError::AccountRetracted(account_id));
        }
        check_public_data(public_data)?;

        // key changes need the owner key, everything else the active key
        if let Some(key) = active_key {
            let owner_signed = self.check_signature(&rec.owner_address());
            if !owner_signed && !self.any_parent_has_signed(&rec.name) {
                return Err(EvalError::MissingSignature);
            }
            if key.is_null() {
                if rec.delegate_info.as_ref().is_some_and(|d| d.pay_balance > 0) {
                    return Err(EvalError::RetractingDelegateWithPay(account_id));
                }
            } else if self.key_in_use(&key.address()) {
                return Err(EvalError::KeyInUse);
            }
            rec.set_active_key(self.now, *key);
        } else if !self.account_or_any_parent_has_signed(&rec) {
            return Err(EvalError::MissingSignature);
        }

        if public_data.is_some() {
            rec.public_data = public_data.clone();
        }

        if let Some(rate) = delegate_pay_rate {
            check_pay_rate(rate)?;
            match rec.delegate_info.as_mut() {
                Some(info) if rate > info.pay_rate => {
                    return Err(EvalError::PayRateIncrease {
                        current: info.pay_rate,
                        requested: rate,
                    });
                }
                Some(info) => info.pay_rate = rate,
                None => {
                    let signing_key = rec.active_key();
                    rec.delegate_info = Some(DelegateStats::new(rate, signing_key, self.block_num));
                    self.required_fees += self.params.delegate_registration_fee;
                }
            }
        }

        rec.last_update = self.now;
        self.store_account(rec);
        Ok(())
    }

    pub(crate) fn evaluate_withdraw_pay(
        &mut self,
        account_id: AccountId,
        amount: Amount,
    ) -> EvalResult<()> {
        if amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount));
        }
        let mut rec = self.account(account_id)?;
        if rec.is_retracted() {
            return Err(EvalError::AccountRetracted(account_id));
        }
        self.require_signature(&rec.active_address())?;

        let Some(info) = rec.delegate_info.as_mut() else {
            return Err(EvalError::NotADelegate(account_id));
        };
        if amount > info.pay_balance {
            return Err(EvalError::InsufficientPay);
        }
        info.pay_balance -= amount;

        // unclaimed pay counts toward the delegate's own votes
        *self.net_delegate_votes.entry(account_id).or_insert(0) -= amount;
        self.store_account(rec);
        self.add_balance(Asset::new(amount, AssetId::BASE))
    }

    pub(crate) fn evaluate_update_signing_key(
        &mut self,
        account_id: AccountId,
        signing_key: &PublicKey,
    ) -> EvalResult<()> {
        let mut rec = self.account(account_id)?;
        if rec.is_retracted() {
            return Err(EvalError::AccountRetracted(account_id));
        }
        if !self.account_or_any_parent_has_signed(&rec) {
            return Err(EvalError::MissingSignature);
        }
        if signing_key.is_null() || self.key_in_use(&signing_key.address()) {
            return Err(EvalError::KeyInUse);
        }

        let Some(info) = rec.delegate_info.as_mut() else {
            return Err(EvalError::NotADelegate(account_id));
        };
        info.signing_key_history
            .insert(self.block_num + 1, *signing_key);
        rec.last_update = self.now;
        self.store_account(rec);
        Ok(())
    }
}
