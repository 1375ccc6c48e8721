//! Transaction builders.

use dexchain_primitives::{
    address::Address,
    amount::Amount,
    buf::Buf32,
    ids::AssetId,
    time::Timestamp,
};
use dexchain_state::{
    balance::WithdrawCondition,
    operation::Operation,
    transaction::{SignedTransaction, Transaction},
};

use crate::keys::secret;

/// Signs a transaction carrying `ops` with test keys `signers`, valid for an
/// hour after `now`.
pub fn signed(
    ops: Vec<Operation>,
    signers: &[u8],
    now: Timestamp,
    chain_id: &Buf32,
) -> SignedTransaction {
    let mut trx = Transaction::new(now.saturating_add_secs(3_600));
    trx.operations = ops;
    let mut signed = SignedTransaction::new(trx);
    for n in signers {
        signed.sign(&secret(*n), chain_id);
    }
    signed
}

/// Withdraws from `owner`'s signature balance.
pub fn withdraw(owner: Address, asset_id: AssetId, amount: Amount) -> Operation {
    let cond = WithdrawCondition::signature(owner, asset_id);
    Operation::withdraw(cond.balance_id(), amount)
}

/// Deposits into `owner`'s signature balance.
pub fn deposit(owner: Address, asset_id: AssetId, amount: Amount) -> Operation {
    Operation::deposit(amount, WithdrawCondition::signature(owner, asset_id))
}
