//! Builds the ledger state at block 0 from a genesis description.

use dexchain_ledger::{ChainStore, LedgerView, LedgerViewExt};
use dexchain_params::{constants::MAX_SHARES, ChainParams, GenesisAsset, GenesisConfig};
use dexchain_primitives::{buf::Buf32, ids::AssetId, time::Timestamp};
use dexchain_state::{
    account::{AccountRecord, DelegateStats},
    asset::{AssetIssuer, AssetRecord},
    balance::{BalanceRecord, WithdrawCondition},
    property::{PropertyId, PropertyValue},
};
use tracing::*;

use crate::{errors::ChainResult, schedule::top_delegates};

fn asset_record(id: AssetId, g: &GenesisAsset, issuer: AssetIssuer, ts: Timestamp) -> AssetRecord {
    AssetRecord {
        id,
        symbol: g.symbol.clone(),
        name: g.name.clone(),
        description: g.description.clone(),
        issuer,
        precision: g.precision,
        registration_date: ts,
        last_update: ts,
        current_share_supply: 0,
        maximum_share_supply: MAX_SHARES,
        collected_fees: 0,
    }
}

/// Creates the genesis ledger: chain properties, the base asset, delegate
/// accounts, initial balances and market issued assets, with the first
/// round of active delegates picked.
pub fn init_genesis_store(config: &GenesisConfig, params: &ChainParams) -> ChainResult<ChainStore> {
    config.validate(params.block_interval_sec)?;

    let ts = config.timestamp;
    let mut store = ChainStore::new();
    store.set_now(ts);
    store.set_property(PropertyId::ChainId, PropertyValue::Hash(config.chain_id()));
    store.set_property(PropertyId::FeeRate, PropertyValue::Amount(params.fee_rate));
    store.set_property(PropertyId::ConfirmationRequirement, PropertyValue::Count(1));
    store.set_random_seed(Buf32::zero());

    let mut base = asset_record(AssetId::BASE, &config.base_asset, AssetIssuer::Network, ts);
    for b in &config.balances {
        let cond = WithdrawCondition::signature(b.owner, AssetId::BASE);
        let mut rec = store
            .get_balance(&cond.balance_id())
            .unwrap_or_else(|| BalanceRecord::empty(cond));
        rec.deposit(b.amount, ts);
        store.store_balance(rec);
        base.current_share_supply += b.amount;
    }
    store.store_asset(base);

    for d in &config.delegates {
        let id = store.next_account_id();
        let mut rec = AccountRecord::new(id, d.name.clone(), d.owner, d.owner, ts);
        rec.delegate_info = Some(DelegateStats::new(d.pay_rate, d.owner, 0));
        store.store_account(rec);
    }

    for g in &config.market_assets {
        let id = store.next_asset_id();
        store.store_asset(asset_record(id, g, AssetIssuer::Market, ts));
    }

    let active = top_delegates(&store, params.num_delegates as usize);
    store.set_active_delegates(active);

    info!(
        chain_id = %store.chain_id(),
        delegates = config.delegates.len(),
        balances = config.balances.len(),
        "initialized genesis state"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use dexchain_params::constants::PRECISION;
    use dexchain_primitives::ids::AccountId;
    use dexchain_test_utils::{
        genesis::{test_genesis, GENESIS_TIME},
        keys::address,
        ledger::balance_of,
    };

    use super::*;
    use crate::errors::ChainError;

    #[test]
    fn test_genesis_store() {
        let genesis = test_genesis(3);
        let params = ChainParams {
            num_delegates: 2,
            ..Default::default()
        };
        let store = init_genesis_store(&genesis, &params).unwrap();

        assert_eq!(store.now(), GENESIS_TIME);
        assert_eq!(store.chain_id(), genesis.chain_id());
        assert_eq!(store.fee_rate(), params.fee_rate);

        let base = store.get_asset(AssetId::BASE).unwrap();
        assert_eq!(base.current_share_supply, 3 * 1_000_000 * PRECISION);
        assert_eq!(balance_of(&store, address(2), AssetId::BASE), 1_000_000 * PRECISION);

        let init1 = store.get_account_by_name("init1").unwrap();
        assert!(init1.is_delegate());
        assert_eq!(init1.signing_key_at(0), Some(genesis.delegates[1].owner));

        // equal votes, lowest ids win
        assert_eq!(
            store.active_delegates(),
            vec![AccountId::new(1), AccountId::new(2)]
        );
        assert!(store.get_asset_by_symbol("USD").unwrap().is_market_issued());
    }

    #[test]
    fn test_invalid_genesis_rejected() {
        let mut genesis = test_genesis(1);
        genesis.delegates.clear();
        let res = init_genesis_store(&genesis, &ChainParams::default());
        assert!(matches!(res, Err(ChainError::Genesis(_))));
    }
}
