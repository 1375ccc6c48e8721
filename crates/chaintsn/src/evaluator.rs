//! Per transaction evaluation state.

use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
};

use dexchain_ledger::{LedgerView, LedgerViewExt, PendingState};
use dexchain_market::{ruleset_for_version, MarketRuleset};
use dexchain_params::ChainParams;
use dexchain_primitives::{
    address::{all_key_addresses, Address},
    amount::{Amount, Asset},
    buf::Buf32,
    ids::{AccountId, AssetId, SlateId},
    time::Timestamp,
};
use dexchain_state::{
    account::{parent_account_name, AccountRecord},
    asset::AssetRecord,
    operation::Operation,
    transaction::{
        SignedTransaction, TransactionLocation, TransactionRecord, TxId, TRANSACTION_VERSION,
    },
};
use tracing::*;

use crate::errors::{EvalError, EvalResult};

/// Evaluates one transaction on an overlay over `V`.
///
/// Nothing reaches the parent view until [`Self::into_pending`] is applied,
/// so a failed evaluation is discarded by dropping the state.
#[derive(Debug)]
pub struct TransactionEvaluationState<'p, V: LedgerView> {
    pub(crate) pending: PendingState<V>,
    pub(crate) params: &'p ChainParams,
    pub(crate) ruleset: &'static MarketRuleset,
    pub(crate) block_num: u32,
    pub(crate) now: Timestamp,
    pub(crate) chain_id: Buf32,

    pub(crate) trx_id: TxId,
    pub(crate) delegate_slate_id: SlateId,
    pub(crate) signed_addresses: BTreeSet<Address>,

    /// Funds moved into (positive) or out of (negative) the transaction.
    pub(crate) balances: BTreeMap<AssetId, Amount>,
    /// Deposits owed to an address, by option exercises.
    pub(crate) required_deposits: BTreeMap<(Address, AssetId), Amount>,
    /// Deposits made to a single owner address.
    pub(crate) provided_deposits: BTreeMap<(Address, AssetId), Amount>,
    pub(crate) net_delegate_votes: BTreeMap<AccountId, Amount>,
    /// Registration fees owed on top of the size based fee, in base.
    pub(crate) required_fees: Amount,
    pub(crate) fees_paid: BTreeMap<AssetId, Amount>,
}

impl<'p, V: LedgerView> TransactionEvaluationState<'p, V> {
    pub fn new(view: V, params: &'p ChainParams, block_num: u32) -> Self {
        let pending = PendingState::new(view);
        let now = pending.now();
        let chain_id = pending.chain_id();
        Self {
            pending,
            params,
            ruleset: ruleset_for_version(params.market_version_at(block_num)),
            block_num,
            now,
            chain_id,
            trx_id: TxId::zero(),
            delegate_slate_id: SlateId::NONE,
            signed_addresses: BTreeSet::new(),
            balances: BTreeMap::new(),
            required_deposits: BTreeMap::new(),
            provided_deposits: BTreeMap::new(),
            net_delegate_votes: BTreeMap::new(),
            required_fees: 0,
            fees_paid: BTreeMap::new(),
        }
    }

    pub fn trx_id(&self) -> &TxId {
        &self.trx_id
    }

    pub fn fees_paid(&self) -> &BTreeMap<AssetId, Amount> {
        &self.fees_paid
    }

    /// Fee paid in the base asset.
    pub fn base_fee(&self) -> Amount {
        self.fees_paid.get(&AssetId::BASE).copied().unwrap_or(0)
    }

    pub fn pending(&self) -> &PendingState<V> {
        &self.pending
    }

    pub fn into_pending(self) -> PendingState<V> {
        self.pending
    }

    /// Runs every check and operation of `trx` and records it at
    /// `(block_num, trx_num)`.
    pub fn evaluate(
        &mut self,
        trx: &SignedTransaction,
        trx_num: u32,
    ) -> EvalResult<TransactionRecord> {
        self.trx_id = trx.id(&self.chain_id);
        let tx = &trx.trx;

        if tx.version != TRANSACTION_VERSION {
            return Err(EvalError::UnsupportedVersion(tx.version));
        }
        if self.now > tx.expiration {
            return Err(EvalError::Expired);
        }
        let horizon = self
            .now
            .saturating_add_secs(self.params.max_transaction_expiration_sec);
        if tx.expiration > horizon {
            return Err(EvalError::ExpirationTooFar);
        }
        if self.pending.get_transaction(&self.trx_id).is_some() {
            return Err(EvalError::Duplicate(self.trx_id));
        }

        self.delegate_slate_id = tx.delegate_slate_id;
        for key in trx.signees(&self.chain_id)? {
            self.signed_addresses.extend(all_key_addresses(&key)?);
        }

        for op in &tx.operations {
            self.evaluate_operation(op)?;
        }

        self.post_evaluate()?;
        self.validate_required_fee(trx.data_size())?;
        self.update_delegate_votes()?;

        let record = TransactionRecord {
            id: self.trx_id,
            location: TransactionLocation {
                block_num: self.block_num,
                trx_num,
            },
            trx: trx.clone(),
            fees_paid: self.fees_paid.clone(),
        };
        self.pending.store_transaction(record.clone());
        for op in &tx.operations {
            self.pending.store_recent_operation(op.clone());
        }

        trace!(
            id = %self.trx_id,
            ops = tx.operations.len(),
            fee = self.base_fee(),
            "evaluated transaction"
        );
        Ok(record)
    }

    fn evaluate_operation(&mut self, op: &Operation) -> EvalResult<()> {
        match op {
            Operation::RegisterAccount {
                name,
                public_data,
                owner_key,
                active_key,
                delegate_pay_rate,
            } => self.evaluate_register_account(
                name,
                public_data,
                owner_key,
                active_key,
                *delegate_pay_rate,
            ),
            Operation::UpdateAccount {
                account_id,
                public_data,
                active_key,
                delegate_pay_rate,
            } => self.evaluate_update_account(
                *account_id,
                public_data,
                active_key.as_ref(),
                *delegate_pay_rate,
            ),
            Operation::WithdrawPay { account_id, amount } => {
                self.evaluate_withdraw_pay(*account_id, *amount)
            }
            Operation::UpdateSigningKey {
                account_id,
                signing_key,
            } => self.evaluate_update_signing_key(*account_id, signing_key),
            Operation::CreateAsset {
                symbol,
                name,
                description,
                issuer,
                maximum_share_supply,
                precision,
            } => self.evaluate_create_asset(
                symbol,
                name,
                description,
                *issuer,
                *maximum_share_supply,
                *precision,
            ),
            Operation::UpdateAsset {
                asset_id,
                name,
                description,
                maximum_share_supply,
                precision,
            } => self.evaluate_update_asset(
                *asset_id,
                name.as_deref(),
                description.as_deref(),
                *maximum_share_supply,
                *precision,
            ),
            Operation::IssueAsset { amount } => self.evaluate_issue_asset(*amount),
            Operation::Burn {
                amount,
                account_id,
                message,
            } => self.evaluate_burn(*amount, *account_id, message),
            Operation::Deposit { amount, condition } => self.evaluate_deposit(*amount, condition),
            Operation::Withdraw {
                balance_id,
                amount,
                claim_input,
            } => self.evaluate_withdraw(balance_id, *amount, claim_input),
            Operation::DefineSlate { delegates } => self.evaluate_define_slate(delegates),
            Operation::Bid { amount, index } => self.evaluate_bid(*amount, index),
            Operation::Ask { amount, index } => self.evaluate_ask(*amount, index),
            Operation::Short {
                amount,
                index,
                interest_apr_bps,
                limit_price,
            } => self.evaluate_short(*amount, index, *interest_apr_bps, *limit_price),
            Operation::Cover {
                amount,
                cover_index,
            } => self.evaluate_cover(*amount, cover_index),
            Operation::AddCollateral {
                amount,
                cover_index,
            } => self.evaluate_add_collateral(*amount, cover_index),
            Operation::UpdateFeed {
                delegate_id,
                quote_id,
                price,
            } => self.evaluate_update_feed(*delegate_id, *quote_id, *price),
        }
    }

    // ===== Finalization =====

    /// Settles the scratch balances.  Leftovers are fees, taken out of
    /// circulation into the asset's collected fees.
    fn post_evaluate(&mut self) -> EvalResult<()> {
        for (&asset_id, &amount) in &self.balances {
            if amount < 0 {
                return Err(EvalError::InsufficientFunds {
                    asset_id,
                    shortfall: -amount,
                });
            }
            if amount == 0 {
                continue;
            }

            let mut asset = self
                .pending
                .get_asset(asset_id)
                .ok_or(EvalError::UnknownAsset(asset_id))?;
            asset.collected_fees = asset
                .collected_fees
                .checked_add(amount)
                .ok_or(EvalError::Overflow)?;
            asset.current_share_supply -= amount;
            self.pending.store_asset(asset);
            self.fees_paid.insert(asset_id, amount);
        }

        for (&(owner, asset_id), &required) in &self.required_deposits {
            let provided = self
                .provided_deposits
                .get(&(owner, asset_id))
                .copied()
                .unwrap_or(0);
            if provided < required {
                return Err(EvalError::MissingDeposit(required - provided, asset_id));
            }
        }
        Ok(())
    }

    fn validate_required_fee(&self, data_size: usize) -> EvalResult<()> {
        let size_fee = self
            .pending
            .fee_rate()
            .checked_mul(data_size as Amount)
            .ok_or(EvalError::Overflow)?
            / 1000;
        let required = size_fee + self.required_fees;
        let paid = self.base_fee();
        if paid < required {
            return Err(EvalError::InsufficientFee { paid, required });
        }
        Ok(())
    }

    fn update_delegate_votes(&mut self) -> EvalResult<()> {
        let deltas = mem::take(&mut self.net_delegate_votes);
        for (id, delta) in deltas {
            if delta == 0 {
                continue;
            }
            let mut account = self.account(id)?;
            let Some(info) = account.delegate_info.as_mut() else {
                return Err(EvalError::NotADelegate(id));
            };
            info.votes_for += delta;
            self.store_account(account);
        }
        Ok(())
    }

    // ===== Scratch balances and votes =====

    pub(crate) fn add_balance(&mut self, amount: Asset) -> EvalResult<()> {
        let slot = self.balances.entry(amount.asset_id).or_insert(0);
        *slot = slot.checked_add(amount.amount).ok_or(EvalError::Overflow)?;
        Ok(())
    }

    pub(crate) fn sub_balance(&mut self, amount: Asset) -> EvalResult<()> {
        let slot = self.balances.entry(amount.asset_id).or_insert(0);
        *slot = slot.checked_sub(amount.amount).ok_or(EvalError::Overflow)?;
        Ok(())
    }

    pub(crate) fn add_vote(&mut self, slate_id: SlateId, amount: Amount) -> EvalResult<()> {
        self.adjust_votes(slate_id, amount)
    }

    pub(crate) fn sub_vote(&mut self, slate_id: SlateId, amount: Amount) -> EvalResult<()> {
        self.adjust_votes(slate_id, -amount)
    }

    fn adjust_votes(&mut self, slate_id: SlateId, delta: Amount) -> EvalResult<()> {
        if slate_id.is_none() {
            return Ok(());
        }
        let slate = self
            .pending
            .get_slate(slate_id)
            .ok_or(EvalError::UnknownSlate(slate_id))?;
        for id in slate.delegates {
            *self.net_delegate_votes.entry(id).or_insert(0) += delta;
        }
        Ok(())
    }

    // ===== Signatures =====

    pub(crate) fn check_signature(&self, addr: &Address) -> bool {
        self.signed_addresses.contains(addr)
    }

    pub(crate) fn require_signature(&self, addr: &Address) -> EvalResult<()> {
        if !self.check_signature(addr) {
            return Err(EvalError::MissingSignature);
        }
        Ok(())
    }

    pub(crate) fn check_multisig(&self, required: u32, owners: &BTreeSet<Address>) -> bool {
        let signed = owners.iter().filter(|a| self.check_signature(a)).count();
        signed >= required as usize
    }

    /// Walks the dotted parents of `name`, skipping retracted or missing
    /// ones, looking for an owner or active key signature.
    pub(crate) fn any_parent_has_signed(&self, name: &str) -> bool {
        let mut cur = parent_account_name(name);
        while let Some(parent) = cur {
            if let Some(rec) = self.pending.get_account_by_name(parent) {
                if !rec.is_retracted()
                    && (self.check_signature(&rec.active_address())
                        || self.check_signature(&rec.owner_address()))
                {
                    return true;
                }
            }
            cur = parent_account_name(parent);
        }
        false
    }

    pub(crate) fn account_or_any_parent_has_signed(&self, rec: &AccountRecord) -> bool {
        if !rec.is_retracted()
            && (self.check_signature(&rec.active_address())
                || self.check_signature(&rec.owner_address()))
        {
            return true;
        }
        self.any_parent_has_signed(&rec.name)
    }

    // ===== Record access =====

    pub(crate) fn account(&self, id: AccountId) -> EvalResult<AccountRecord> {
        self.pending
            .get_account(id)
            .ok_or(EvalError::UnknownAccount(id))
    }

    pub(crate) fn asset(&self, id: AssetId) -> EvalResult<AssetRecord> {
        self.pending.get_asset(id).ok_or(EvalError::UnknownAsset(id))
    }

    /// Stores an account.  Pay rates only ever go down; a record that raises
    /// one means an evaluator let it through.
    pub(crate) fn store_account(&mut self, rec: AccountRecord) {
        if let Some(old) = self.pending.get_account(rec.id) {
            let rates = (old.delegate_pay_rate(), rec.delegate_pay_rate());
            if let (Some(before), Some(after)) = rates {
                assert!(after <= before, "delegate pay rate increased");
            }
        }
        self.pending.store_account(rec);
    }

    /// Whether some account already uses `addr` as its owner or active key.
    pub(crate) fn key_in_use(&self, addr: &Address) -> bool {
        self.pending.get_account_by_address(addr).is_some()
    }
}

/// Evaluates `trx` on an overlay over `view` and pushes its writes down on
/// success.  On failure `view` is untouched.
pub fn evaluate_transaction<V: LedgerView>(
    view: &mut V,
    params: &ChainParams,
    block_num: u32,
    trx: &SignedTransaction,
    trx_num: u32,
) -> EvalResult<TransactionRecord> {
    let mut state = TransactionEvaluationState::new(&mut *view, params, block_num);
    match state.evaluate(trx, trx_num) {
        Ok(record) => {
            state.into_pending().apply_changes();
            Ok(record)
        }
        Err(e) => {
            debug!(%e, "transaction rejected");
            Err(e)
        }
    }
}
