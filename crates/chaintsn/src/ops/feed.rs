use dexchain_ledger::{LedgerView, LedgerViewExt};
use dexchain_primitives::{
    ids::{AccountId, AssetId},
    price::Price,
};
use dexchain_state::{
    feed::{FeedIndex, FeedRecord},
    market::MarketPair,
};
use tracing::*;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    /// Publishes an active delegate's price for a market issued asset.
    pub(crate) fn evaluate_update_feed(
        &mut self,
        delegate_id: AccountId,
        quote_id: AssetId,
        price: Price,
    ) -> EvalResult<()> {
        let account = self.account(delegate_id)?;
        if account.is_retracted() {
            return Err(EvalError::AccountRetracted(delegate_id));
        }
        if !account.is_delegate() {
            return Err(EvalError::NotADelegate(delegate_id));
        }
        if !self.pending.is_active_delegate(delegate_id) {
            return Err(EvalError::NotActiveDelegate(delegate_id));
        }

        let signed_by_producer = account
            .signing_key_at(self.block_num)
            .is_some_and(|k| self.check_signature(&k.address()));
        if !signed_by_producer && !self.account_or_any_parent_has_signed(&account) {
            return Err(EvalError::MissingSignature);
        }

        if !self.asset(quote_id)?.is_market_issued() {
            return Err(EvalError::NotMarketIssued(quote_id));
        }
        if price.is_zero() || price.quote_id != quote_id || !price.base_id.is_base() {
            return Err(EvalError::InvalidFeed);
        }

        self.pending.store_feed(FeedRecord {
            index: FeedIndex {
                quote_id,
                delegate_id,
            },
            value: price,
            last_update: self.now,
        });
        self.pending
            .mark_market_dirty(MarketPair::new(quote_id, AssetId::BASE));
        trace!(%delegate_id, %quote_id, %price, "feed updated");
        Ok(())
    }
}
