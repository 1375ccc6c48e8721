use dexchain_ledger::{LedgerView, LedgerViewExt};
use dexchain_params::constants::{
    MAX_ASSET_DESCRIPTION_SIZE, MAX_ASSET_NAME_SIZE, MAX_BURN_MESSAGE_SIZE, MAX_SHARES,
};
use dexchain_primitives::{
    amount::{Amount, Asset},
    ids::{AccountId, AssetId},
};
use dexchain_state::asset::{
    is_valid_precision, is_valid_symbol, parent_symbol, AssetIssuer, AssetRecord,
};
use tracing::*;

use crate::{
    errors::{EvalError, EvalResult},
    evaluator::TransactionEvaluationState,
};

fn check_name(name: &str) -> EvalResult<()> {
    if name.is_empty() || name.len() > MAX_ASSET_NAME_SIZE {
        return Err(EvalError::InvalidAssetName);
    }
    Ok(())
}

fn check_description(description: &str) -> EvalResult<()> {
    if description.len() > MAX_ASSET_DESCRIPTION_SIZE {
        return Err(EvalError::InvalidDescription);
    }
    Ok(())
}

fn check_max_supply(max: Amount) -> EvalResult<()> {
    if max <= 0 || max > MAX_SHARES {
        return Err(EvalError::InvalidMaxSupply(max));
    }
    Ok(())
}

impl<V: LedgerView> TransactionEvaluationState<'_, V> {
    fn require_account_signed(&self, id: AccountId) -> EvalResult<()> {
        let account = self.account(id)?;
        if !self.account_or_any_parent_has_signed(&account) {
            return Err(EvalError::MissingSignature);
        }
        Ok(())
    }

    /// Loads a user issued asset whose issuer signed the transaction.
    fn issued_asset(&self, asset_id: AssetId) -> EvalResult<AssetRecord> {
        let asset = self.asset(asset_id)?;
        let issuer = asset
            .issuer_account()
            .ok_or(EvalError::NotUserIssued(asset_id))?;
        self.require_account_signed(issuer)?;
        Ok(asset)
    }

    pub(crate) fn evaluate_create_asset(
        &mut self,
        symbol: &str,
        name: &str,
        description: &str,
        issuer: AssetIssuer,
        maximum_share_supply: Amount,
        precision: Amount,
    ) -> EvalResult<()> {
        if !is_valid_symbol(symbol) {
            return Err(EvalError::InvalidSymbol(symbol.to_owned()));
        }
        if self.pending.get_asset_by_symbol(symbol).is_some() {
            return Err(EvalError::SymbolInUse(symbol.to_owned()));
        }

        // sub-assets belong to whoever issues the parent
        if let Some(parent) = parent_symbol(symbol) {
            let parent_asset = self
                .pending
                .get_asset_by_symbol(parent)
                .ok_or_else(|| EvalError::UnknownAssetSymbol(parent.to_owned()))?;
            let parent_issuer = parent_asset
                .issuer_account()
                .ok_or_else(|| EvalError::InvalidSymbol(symbol.to_owned()))?;
            self.require_account_signed(parent_issuer)?;
        }

        check_name(name)?;
        check_description(description)?;
        match issuer {
            AssetIssuer::Account(id) => self.require_account_signed(id)?,
            AssetIssuer::Market => {}
            AssetIssuer::Network => return Err(EvalError::InvalidIssuer),
        }
        check_max_supply(maximum_share_supply)?;
        if !is_valid_precision(precision) {
            return Err(EvalError::InvalidPrecision(precision));
        }

        let id = self.pending.next_asset_id();
        self.pending.store_asset(AssetRecord {
            id,
            symbol: symbol.to_owned(),
            name: name.to_owned(),
            description: description.to_owned(),
            issuer,
            precision,
            registration_date: self.now,
            last_update: self.now,
            current_share_supply: 0,
            maximum_share_supply,
            collected_fees: 0,
        });
        self.required_fees += self.params.asset_registration_fee;
        debug!(%id, %symbol, ?issuer, "created asset");
        Ok(())
    }

    pub(crate) fn evaluate_update_asset(
        &mut self,
        asset_id: AssetId,
        name: Option<&str>,
        description: Option<&str>,
        maximum_share_supply: Option<Amount>,
        precision: Option<Amount>,
    ) -> EvalResult<()> {
        let mut asset = self.issued_asset(asset_id)?;
        let before = asset.clone();

        if let Some(name) = name {
            check_name(name)?;
            asset.name = name.to_owned();
        }
        if let Some(description) = description {
            check_description(description)?;
            asset.description = description.to_owned();
        }

        let supply_locked = maximum_share_supply.is_some_and(|m| m != asset.maximum_share_supply)
            || precision.is_some_and(|p| p != asset.precision);
        if supply_locked && asset.current_share_supply != 0 {
            return Err(EvalError::SupplyNotZero(asset_id));
        }
        if let Some(max) = maximum_share_supply {
            check_max_supply(max)?;
            if max < asset.current_share_supply {
                return Err(EvalError::InvalidMaxSupply(max));
            }
            asset.maximum_share_supply = max;
        }
        if let Some(precision) = precision {
            if !is_valid_precision(precision) {
                return Err(EvalError::InvalidPrecision(precision));
            }
            asset.precision = precision;
        }

        if asset == before {
            return Err(EvalError::NoOpUpdate);
        }
        asset.last_update = self.now;
        self.pending.store_asset(asset);
        Ok(())
    }

    pub(crate) fn evaluate_issue_asset(&mut self, amount: Asset) -> EvalResult<()> {
        let mut asset = self.issued_asset(amount.asset_id)?;
        if amount.amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount.amount));
        }
        if !asset.can_issue(amount.amount) {
            return Err(EvalError::OverIssue(amount.amount));
        }

        asset.current_share_supply += amount.amount;
        asset.last_update = self.now;
        self.pending.store_asset(asset);
        self.add_balance(amount)
    }

    pub(crate) fn evaluate_burn(
        &mut self,
        amount: Asset,
        account_id: Option<AccountId>,
        message: &str,
    ) -> EvalResult<()> {
        if amount.amount <= 0 {
            return Err(EvalError::NonPositiveAmount(amount.amount));
        }
        if message.len() > MAX_BURN_MESSAGE_SIZE {
            return Err(EvalError::MessageTooLong);
        }
        if let Some(id) = account_id {
            self.account(id)?;
        }
        let mut asset = self.asset(amount.asset_id)?;
        if asset.is_market_issued() {
            return Err(EvalError::MarketIssuedBurn(amount.asset_id));
        }

        self.sub_balance(amount)?;
        asset.current_share_supply -= amount.amount;
        self.pending.store_asset(asset);
        Ok(())
    }
}
