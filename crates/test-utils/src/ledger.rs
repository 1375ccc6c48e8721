//! Hand built ledger states.

use dexchain_ledger::{ChainStore, LedgerView, LedgerViewExt};
use dexchain_params::constants::{MAX_SHARES, PRECISION};
use dexchain_primitives::{
    address::Address,
    amount::Amount,
    buf::Buf32,
    ids::{AccountId, AssetId},
    time::Timestamp,
};
use dexchain_state::{
    account::{AccountRecord, DelegateStats},
    asset::{AssetIssuer, AssetRecord},
    balance::{BalanceRecord, WithdrawCondition},
    property::{PropertyId, PropertyValue},
};

use crate::keys::public;

/// Clock of a fresh test store.
pub const TEST_NOW: Timestamp = Timestamp::from_secs(1_500_000_000);

pub const TEST_CHAIN_ID: Buf32 = Buf32::new([0xcc; 32]);

/// Store holding only the base asset, with a zero fee rate so tests only pay
/// the fees they mean to.
pub fn test_store() -> ChainStore {
    let mut store = ChainStore::new();
    store.set_now(TEST_NOW);
    store.set_property(PropertyId::ChainId, PropertyValue::Hash(TEST_CHAIN_ID));
    store.set_property(PropertyId::FeeRate, PropertyValue::Amount(0));
    store.store_asset(AssetRecord {
        id: AssetId::BASE,
        symbol: "DXC".to_owned(),
        name: "Test shares".to_owned(),
        description: String::new(),
        issuer: AssetIssuer::Network,
        precision: PRECISION,
        registration_date: TEST_NOW,
        last_update: TEST_NOW,
        current_share_supply: 0,
        maximum_share_supply: MAX_SHARES,
        collected_fees: 0,
    });
    store
}

/// Credits a signature balance of `owner` and grows the supply to match.
pub fn fund(store: &mut ChainStore, owner: Address, asset_id: AssetId, amount: Amount) {
    let cond = WithdrawCondition::signature(owner, asset_id);
    let mut rec = store
        .get_balance(&cond.balance_id())
        .unwrap_or_else(|| BalanceRecord::empty(cond));
    rec.deposit(amount, store.now());
    store.store_balance(rec);

    if let Some(mut asset) = store.get_asset(asset_id) {
        asset.current_share_supply += amount;
        store.store_asset(asset);
    }
}

pub fn balance_of(store: &impl LedgerView, owner: Address, asset_id: AssetId) -> Amount {
    let cond = WithdrawCondition::signature(owner, asset_id);
    store.get_balance(&cond.balance_id()).map_or(0, |b| b.balance)
}

/// Registers an account owned by test key `key`, as a delegate when
/// `pay_rate` is given.
pub fn add_account(
    store: &mut ChainStore,
    name: &str,
    key: u8,
    pay_rate: Option<u8>,
) -> AccountId {
    let id = store.next_account_id();
    let pk = public(key);
    let mut rec = AccountRecord::new(id, name.to_owned(), pk, pk, store.now());
    rec.delegate_info = pay_rate.map(|rate| DelegateStats::new(rate, pk, 0));
    store.store_account(rec);
    id
}

fn add_asset(store: &mut ChainStore, symbol: &str, issuer: AssetIssuer) -> AssetId {
    let id = store.next_asset_id();
    let now = store.now();
    store.store_asset(AssetRecord {
        id,
        symbol: symbol.to_owned(),
        name: symbol.to_lowercase(),
        description: String::new(),
        issuer,
        precision: PRECISION,
        registration_date: now,
        last_update: now,
        current_share_supply: 0,
        maximum_share_supply: MAX_SHARES,
        collected_fees: 0,
    });
    id
}

pub fn add_user_asset(store: &mut ChainStore, symbol: &str, issuer: AccountId) -> AssetId {
    add_asset(store, symbol, AssetIssuer::Account(issuer))
}

pub fn add_market_asset(store: &mut ChainStore, symbol: &str) -> AssetId {
    add_asset(store, symbol, AssetIssuer::Market)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::address;

    #[test]
    fn test_fund_tracks_supply() {
        let mut store = test_store();
        fund(&mut store, address(1), AssetId::BASE, 500);
        fund(&mut store, address(1), AssetId::BASE, 250);
        assert_eq!(balance_of(&store, address(1), AssetId::BASE), 750);
        assert_eq!(store.get_asset(AssetId::BASE).unwrap().current_share_supply, 750);
    }

    #[test]
    fn test_accounts_and_assets_get_fresh_ids() {
        let mut store = test_store();
        let a = add_account(&mut store, "alice", 1, None);
        let b = add_account(&mut store, "bob", 2, Some(50));
        assert_ne!(a, b);
        assert!(store.get_account(b).unwrap().is_delegate());

        let usd = add_market_asset(&mut store, "USD");
        assert!(store.get_asset(usd).unwrap().is_market_issued());
        assert_eq!(store.get_asset_by_symbol("USD").unwrap().id, usd);
    }
}
