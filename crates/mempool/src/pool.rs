use std::{
    collections::{BTreeMap, HashMap},
    mem,
};

use dexchain_chaintsn::evaluate_transaction;
use dexchain_ledger::{LedgerView, LedgerViewExt, PendingState, StateDelta};
use dexchain_params::ChainParams;
use dexchain_primitives::{amount::Amount, ids::AssetId};
use dexchain_state::transaction::{SignedTransaction, TransactionRecord, TxId};
use tracing::*;

use crate::{
    types::{MempoolConfig, MempoolStats, PoolEntry, PoolOrderingKey},
    MempoolError, MempoolResult,
};

/// Fee ordered pool of transactions valid on top of the head.
///
/// Pending transactions are valid together: each one was evaluated on top of
/// the writes of those admitted before it.  Those writes are kept as a
/// [`StateDelta`] and replayed into a throwaway overlay for every admission.
#[derive(Debug, Default)]
pub struct PendingPool {
    config: MempoolConfig,
    entries: HashMap<TxId, PoolEntry>,
    ordering: BTreeMap<PoolOrderingKey, TxId>,
    pool_delta: StateDelta,
    /// Transactions of popped blocks, evaluated on the next revalidation.
    requeued: Vec<SignedTransaction>,
    stats: MempoolStats,
}

impl PendingPool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&PoolEntry> {
        self.entries.get(id)
    }

    pub fn stats(&self) -> &MempoolStats {
        &self.stats
    }

    /// Pending transactions, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &PoolEntry> + '_ {
        self.ordering.values().filter_map(|id| self.entries.get(id))
    }

    /// Evaluates `trx` on top of `view` and every pending transaction, and
    /// keeps it on success.  `view` itself is never written.
    pub fn admit<V: LedgerView>(
        &mut self,
        view: &mut V,
        params: &ChainParams,
        block_num: u32,
        trx: SignedTransaction,
    ) -> MempoolResult<TxId> {
        let res = self.try_admit(view, params, block_num, trx);
        if let Err(e) = &res {
            self.stats.rejected += 1;
            debug!(%e, "rejected pending transaction");
        }
        res
    }

    fn try_admit<V: LedgerView>(
        &mut self,
        view: &mut V,
        params: &ChainParams,
        block_num: u32,
        trx: SignedTransaction,
    ) -> MempoolResult<TxId> {
        let id = trx.id(&view.chain_id());
        if self.contains(&id) {
            return Err(MempoolError::Duplicate(id));
        }

        let size = trx.data_size();
        if size > self.config.max_tx_size {
            return Err(MempoolError::TransactionTooLarge {
                size,
                limit: self.config.max_tx_size,
            });
        }
        if self.entries.len() >= self.config.max_tx_count {
            return Err(MempoolError::PoolFull {
                current: self.entries.len(),
                limit: self.config.max_tx_count,
            });
        }

        let mut state = PendingState::new(view);
        self.pool_delta.apply_to(&mut state);
        let record = evaluate_transaction(&mut state, params, block_num, &trx, 0)?;
        self.pool_delta = state.into_delta();

        self.insert(&record, trx, size);
        trace!(%id, pending = self.entries.len(), "admitted transaction");
        Ok(id)
    }

    fn insert(&mut self, record: &TransactionRecord, trx: SignedTransaction, size: usize) {
        let fee = record.fees_paid.get(&AssetId::BASE).copied().unwrap_or(0);
        let key = PoolOrderingKey::new(fee, record.id);
        self.ordering.insert(key, record.id);
        self.entries.insert(record.id, PoolEntry { trx, key, size });
        self.stats.tx_count = self.entries.len();
        self.stats.total_bytes += size;
    }

    /// Queues the transactions of a popped block for the next
    /// [`Self::revalidate`].
    pub fn requeue(&mut self, trxs: impl IntoIterator<Item = SignedTransaction>) {
        self.requeued.extend(trxs);
    }

    /// Re-evaluates the pool on top of a new head, cumulatively and in
    /// priority order.  Requeued transactions are ranked by the fee they pay
    /// on their own over the new head.  Returns the ids of the transactions
    /// that no longer evaluate and were dropped, including those that made
    /// it into a block.
    pub fn revalidate<V: LedgerView>(
        &mut self,
        view: &mut V,
        params: &ChainParams,
        block_num: u32,
    ) -> Vec<TxId> {
        let chain_id = view.chain_id();
        let mut old_entries = mem::take(&mut self.entries);
        let mut queue: Vec<(PoolOrderingKey, SignedTransaction)> = mem::take(&mut self.ordering)
            .into_iter()
            .filter_map(|(key, id)| old_entries.remove(&id).map(|e| (key, e.trx)))
            .collect();
        for trx in mem::take(&mut self.requeued) {
            let fee = standalone_fee(&mut *view, params, block_num, &trx);
            queue.push((PoolOrderingKey::new(fee, trx.id(&chain_id)), trx));
        }
        queue.sort_by(|a, b| a.0.cmp(&b.0));

        self.pool_delta = StateDelta::default();
        self.stats.tx_count = 0;
        self.stats.total_bytes = 0;

        let mut state = PendingState::new(view);
        let mut dropped = Vec::new();
        for (key, trx) in queue {
            let id = *key.id();
            if self.contains(&id) {
                continue;
            }
            if self.entries.len() >= self.config.max_tx_count {
                dropped.push(id);
                continue;
            }

            let size = trx.data_size();
            match evaluate_transaction(&mut state, params, block_num, &trx, 0) {
                Ok(record) => self.insert(&record, trx, size),
                Err(e) => {
                    debug!(%id, %e, "dropping pending transaction");
                    dropped.push(id);
                }
            }
        }
        self.pool_delta = state.into_delta();
        self.stats.dropped += dropped.len() as u64;

        if !dropped.is_empty() {
            info!(
                kept = self.entries.len(),
                dropped = dropped.len(),
                "revalidated pending pool"
            );
        }
        dropped
    }

    /// Empties the pool.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ordering.clear();
        self.requeued.clear();
        self.pool_delta = StateDelta::default();
        self.stats.tx_count = 0;
        self.stats.total_bytes = 0;
    }
}

/// Base fee `trx` pays when evaluated alone on `view`, zero if it fails.
fn standalone_fee<V: LedgerView>(
    view: &mut V,
    params: &ChainParams,
    block_num: u32,
    trx: &SignedTransaction,
) -> Amount {
    let mut state = PendingState::new(view);
    evaluate_transaction(&mut state, params, block_num, trx, 0)
        .map_or(0, |r| r.fees_paid.get(&AssetId::BASE).copied().unwrap_or(0))
}
