use std::cmp::Reverse;

use dexchain_params::constants::{MAX_BLOCK_SIZE, MAX_PENDING_QUEUE_SIZE};
use dexchain_primitives::amount::Amount;
use dexchain_state::transaction::{SignedTransaction, TxId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolConfig {
    #[serde(default = "default_max_tx_count")]
    pub max_tx_count: usize,

    /// Transactions bigger than this could never fit in a block.
    #[serde(default = "default_max_tx_size")]
    pub max_tx_size: usize,
}

fn default_max_tx_count() -> usize {
    MAX_PENDING_QUEUE_SIZE
}

fn default_max_tx_size() -> usize {
    MAX_BLOCK_SIZE
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_tx_count: default_max_tx_count(),
            max_tx_size: default_max_tx_size(),
        }
    }
}

/// Priority of a pending transaction.  Sorts highest fee first, then by id
/// so equal fees still have one order on every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolOrderingKey {
    fee: Reverse<Amount>,
    id: TxId,
}

impl PoolOrderingKey {
    pub fn new(fee: Amount, id: TxId) -> Self {
        Self {
            fee: Reverse(fee),
            id,
        }
    }

    pub fn fee(&self) -> Amount {
        self.fee.0
    }

    pub fn id(&self) -> &TxId {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub struct PoolEntry {
    pub trx: SignedTransaction,
    pub key: PoolOrderingKey,
    pub size: usize,
}

impl PoolEntry {
    pub fn id(&self) -> &TxId {
        self.key.id()
    }

    /// Fee paid in the base asset.
    pub fn fee(&self) -> Amount {
        self.key.fee()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MempoolStats {
    pub tx_count: usize,
    pub total_bytes: usize,
    /// Submissions turned away, duplicates included.
    pub rejected: u64,
    /// Pending transactions that stopped evaluating after a head change.
    pub dropped: u64,
}
