use std::collections::BTreeSet;

use dexchain_params::constants::DEFAULT_FEE_RATE;
use dexchain_primitives::{
    amount::Amount,
    buf::Buf32,
    ids::{AccountId, AssetId},
};
use dexchain_state::{
    market::MarketPair,
    property::{PropertyId, PropertyValue},
};

use crate::view::LedgerView;

/// Typed accessors for chain properties.
pub trait LedgerViewExt: LedgerView {
    fn chain_id(&self) -> Buf32 {
        self.get_property(PropertyId::ChainId)
            .and_then(|v| v.as_hash())
            .unwrap_or_default()
    }

    fn fee_rate(&self) -> Amount {
        self.get_property(PropertyId::FeeRate)
            .and_then(|v| v.as_amount())
            .unwrap_or(DEFAULT_FEE_RATE)
    }

    fn active_delegates(&self) -> Vec<AccountId> {
        self.get_property(PropertyId::ActiveDelegates)
            .and_then(|v| v.as_delegates().map(<[AccountId]>::to_vec))
            .unwrap_or_default()
    }

    fn set_active_delegates(&mut self, delegates: Vec<AccountId>) {
        self.set_property(PropertyId::ActiveDelegates, PropertyValue::Delegates(delegates));
    }

    fn is_active_delegate(&self, id: AccountId) -> bool {
        self.active_delegates().contains(&id)
    }

    fn random_seed(&self) -> Buf32 {
        self.get_property(PropertyId::LastRandomSeed)
            .and_then(|v| v.as_hash())
            .unwrap_or_default()
    }

    fn set_random_seed(&mut self, seed: Buf32) {
        self.set_property(PropertyId::LastRandomSeed, PropertyValue::Hash(seed));
    }

    fn dirty_markets(&self) -> BTreeSet<MarketPair> {
        self.get_property(PropertyId::DirtyMarkets)
            .and_then(|v| v.as_markets().cloned())
            .unwrap_or_default()
    }

    fn mark_market_dirty(&mut self, pair: MarketPair) {
        let mut markets = self.dirty_markets();
        if markets.insert(pair) {
            self.set_property(PropertyId::DirtyMarkets, PropertyValue::Markets(markets));
        }
    }

    fn clear_dirty_markets(&mut self) {
        if !self.dirty_markets().is_empty() {
            self.set_property(
                PropertyId::DirtyMarkets,
                PropertyValue::Markets(BTreeSet::new()),
            );
        }
    }

    fn last_account_id(&self) -> AccountId {
        self.get_property(PropertyId::LastAccountId)
            .and_then(|v| v.as_account_id())
            .unwrap_or_default()
    }

    /// Allocates the next account id.
    fn next_account_id(&mut self) -> AccountId {
        let id = AccountId::new(self.last_account_id().inner() + 1);
        self.set_property(PropertyId::LastAccountId, PropertyValue::AccountId(id));
        id
    }

    fn last_asset_id(&self) -> AssetId {
        self.get_property(PropertyId::LastAssetId)
            .and_then(|v| v.as_asset_id())
            .unwrap_or_default()
    }

    /// Allocates the next asset id.  Id 0 is the base asset and is created
    /// at genesis without going through here.
    fn next_asset_id(&mut self) -> AssetId {
        let id = AssetId::new(self.last_asset_id().inner() + 1);
        self.set_property(PropertyId::LastAssetId, PropertyValue::AssetId(id));
        id
    }

    fn confirmation_requirement(&self) -> u32 {
        self.get_property(PropertyId::ConfirmationRequirement)
            .and_then(|v| v.as_count())
            .unwrap_or(0)
    }
}

impl<V: LedgerView + ?Sized> LedgerViewExt for V {}
