//! Shared setup for the evaluator tests.

use dexchain_ledger::{ChainStore, LedgerView};
use dexchain_params::{ChainParams, ForkSchedule};
use dexchain_primitives::{
    amount::Amount,
    ids::{AccountId, AssetId},
};
use dexchain_state::{operation::Operation, transaction::TransactionRecord};
pub(crate) use dexchain_test_utils::keys::{address, public};
use dexchain_test_utils::{
    ledger::{add_account, balance_of, fund, test_store, TEST_CHAIN_ID},
    tx::{signed, withdraw},
};

use crate::{errors::EvalResult, evaluator::evaluate_transaction};

pub(crate) const ALICE: u8 = 1;
pub(crate) const DELEGATE: u8 = 2;
pub(crate) const FUNDS: Amount = 1_000_000_000;

/// A store with a plain account `alice` and a delegate `del` at pay rate 50,
/// both funded with [`FUNDS`] base.  Runs the latest market rules.
pub(crate) struct Fixture {
    pub(crate) store: ChainStore,
    pub(crate) params: ChainParams,
    pub(crate) alice: AccountId,
    pub(crate) delegate: AccountId,
    pub(crate) block_num: u32,
    trx_num: u32,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let mut store = test_store();
        let alice = add_account(&mut store, "alice", ALICE, None);
        let delegate = add_account(&mut store, "del", DELEGATE, Some(50));
        fund(&mut store, address(ALICE), AssetId::BASE, FUNDS);
        fund(&mut store, address(DELEGATE), AssetId::BASE, FUNDS);
        Self {
            store,
            params: ChainParams {
                forks: ForkSchedule::fixed(7),
                ..Default::default()
            },
            alice,
            delegate,
            block_num: 1,
            trx_num: 0,
        }
    }

    pub(crate) fn apply(
        &mut self,
        ops: Vec<Operation>,
        signers: &[u8],
    ) -> EvalResult<TransactionRecord> {
        let trx = signed(ops, signers, self.store.now(), &TEST_CHAIN_ID);
        self.trx_num += 1;
        let (block_num, trx_num) = (self.block_num, self.trx_num);
        evaluate_transaction(&mut self.store, &self.params, block_num, &trx, trx_num)
    }

    pub(crate) fn balance(&self, key: u8, asset_id: AssetId) -> Amount {
        balance_of(&self.store, address(key), asset_id)
    }

    pub(crate) fn supply(&self, asset_id: AssetId) -> Amount {
        self.store
            .get_asset(asset_id)
            .map_or(0, |a| a.current_share_supply)
    }
}

/// Pays `amount` base out of `key`'s balance, all of it left as fee unless
/// deposited elsewhere in the same transaction.
pub(crate) fn pay(key: u8, amount: Amount) -> Operation {
    withdraw(address(key), AssetId::BASE, amount)
}
