//! The chain orchestrator: owns the committed ledger, decides which blocks
//! make up the main chain and keeps the pending pool valid on top of it.

use std::sync::Arc;

use dexchain_chaintsn::evaluate_transaction;
use dexchain_db::BlockDatabase;
use dexchain_ledger::{ChainStore, PendingState};
use dexchain_mempool::{MempoolConfig, PendingPool};
use dexchain_params::{ChainParams, GenesisConfig};
use dexchain_primitives::{buf::Buf20, time::Timestamp, SecretKey};
use dexchain_state::{
    block::{Block, BlockHeader, BlockId},
    transaction::{SignedTransaction, TxId},
};
use tracing::*;

use crate::{
    apply::apply_block,
    clock::Clock,
    errors::{ChainError, ChainResult},
    fork_tracker::{BlockStatus, ForkTracker},
    genesis::init_genesis_store,
};

/// The block the ledger currently reflects.  Before the first block this is
/// the genesis state, with the zero id.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChainHead {
    pub id: BlockId,
    pub block_num: u32,
    pub timestamp: Timestamp,
}

impl ChainHead {
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self {
            id: BlockId::zero(),
            block_num: 0,
            timestamp,
        }
    }

    pub fn of(header: &BlockHeader) -> Self {
        Self {
            id: header.id(),
            block_num: header.block_num,
            timestamp: header.timestamp,
        }
    }
}

#[derive(Debug)]
pub struct ChainDatabase<D: BlockDatabase, C: Clock> {
    db: Arc<D>,
    store: ChainStore,
    params: ChainParams,
    clock: Arc<C>,
    pool: PendingPool,
    genesis_time: Timestamp,
    head: ChainHead,
    forks: ForkTracker,
}

impl<D: BlockDatabase, C: Clock> ChainDatabase<D, C> {
    /// Builds the genesis ledger and replays the main chain stored in `db`
    /// on top of it.
    pub fn open(
        db: Arc<D>,
        genesis: &GenesisConfig,
        params: ChainParams,
        pool_config: MempoolConfig,
        clock: Arc<C>,
    ) -> ChainResult<Self> {
        let store = init_genesis_store(genesis, &params)?;
        let mut chain = Self {
            db,
            store,
            params,
            clock,
            pool: PendingPool::new(pool_config),
            genesis_time: genesis.timestamp,
            head: ChainHead::genesis(genesis.timestamp),
            forks: ForkTracker::new(),
        };
        chain.replay()?;
        Ok(chain)
    }

    fn replay(&mut self) -> ChainResult<()> {
        let Some((tip, _)) = self.db.main_chain_tip()? else {
            return Ok(());
        };

        let mut blocks = Vec::with_capacity(tip as usize);
        for n in 1..=tip {
            let id = self
                .db
                .get_main_chain_id(n)?
                .ok_or(ChainError::UnknownBlock(BlockId::zero()))?;
            blocks.push(self.load_block(&id)?);
        }
        while self.db.pop_main_chain()?.is_some() {}

        info!(%tip, "replaying main chain");
        for block in &blocks {
            self.forks.insert(block.id(), block.header.previous);
            // stored blocks were checked against the clock when received
            self.extend_chain(block, block.timestamp())?;
        }
        info!(head = %self.head.id, block_num = %self.head.block_num, "replay finished");
        Ok(())
    }

    pub fn head(&self) -> &ChainHead {
        &self.head
    }

    pub fn store(&self) -> &ChainStore {
        &self.store
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pool(&self) -> &PendingPool {
        &self.pool
    }

    pub fn get_block(&self, id: &BlockId) -> ChainResult<Option<Block>> {
        Ok(self.db.get_block(id)?)
    }

    pub fn main_chain_id(&self, block_num: u32) -> ChainResult<Option<BlockId>> {
        Ok(self.db.get_main_chain_id(block_num)?)
    }

    pub fn block_status(&self, id: &BlockId) -> Option<BlockStatus> {
        self.forks.get(id).map(|f| f.status())
    }

    fn load_block(&self, id: &BlockId) -> ChainResult<Block> {
        self.db
            .get_block(id)?
            .ok_or(ChainError::UnknownBlock(*id))
    }

    /// Stores a block and, when it extends the head or completes a longer
    /// fork, makes it part of the main chain.
    pub fn push_block(&mut self, block: Block) -> ChainResult<BlockStatus> {
        let id = block.id();
        if let Some(known) = self.forks.get(&id) {
            if known.is_valid == Some(false) {
                return Err(ChainError::KnownInvalid(id));
            }
            if known.is_included {
                return Ok(BlockStatus::MainChain);
            }
        }

        self.db.put_block(&block)?;
        let data = self.forks.insert(id, block.header.previous);
        debug!(%id, block_num = %block.block_num(), "received block");

        let now = self.clock.now();
        let res = if block.header.previous == self.head.id {
            let res = self.extend_chain(&block, now);
            if let Err(e) = &res {
                warn!(%id, %e, "block failed to apply");
                self.forks.mark_invalid(id);
            }
            res
        } else if data.can_link() && block.block_num() > self.head.block_num {
            self.switch_to_fork(id)
        } else {
            Ok(())
        };

        let res = res.and_then(|_| self.extend_with_known_children());
        self.revalidate_pool();
        res?;

        Ok(self.block_status(&id).unwrap_or(BlockStatus::Received))
    }

    /// Keeps extending the head with blocks that arrived before their
    /// parent did.
    fn extend_with_known_children(&mut self) -> ChainResult<()> {
        loop {
            let next: Vec<BlockId> = self
                .forks
                .get(&self.head.id)
                .map(|f| f.next_blocks.iter().copied().collect())
                .unwrap_or_default();

            let mut extended = false;
            let now = self.clock.now();
            for id in next {
                if !self
                    .forks
                    .get(&id)
                    .is_some_and(|f| f.can_link() && f.is_valid.is_none())
                {
                    continue;
                }
                let block = self.load_block(&id)?;
                match self.extend_chain(&block, now) {
                    Ok(()) => {
                        extended = true;
                        break;
                    }
                    Err(e) => {
                        warn!(%id, %e, "waiting block failed to apply");
                        self.forks.mark_invalid(id);
                    }
                }
            }
            if !extended {
                return Ok(());
            }
        }
    }

    /// Applies a block built on the head and commits it.
    fn extend_chain(&mut self, block: &Block, local_now: Timestamp) -> ChainResult<()> {
        let applied = apply_block(&mut self.store, &self.params, &self.head, block, local_now)?;
        let id = block.id();
        let block_num = block.block_num();

        self.db.put_undo(&id, &applied.undo)?;
        self.db.push_main_chain(block_num, id)?;
        applied.delta.apply_to(&mut self.store);
        self.store.set_now(block.timestamp());
        self.head = ChainHead::of(&block.header);
        self.forks.mark_included(id, true);

        if block_num > self.params.max_undo_history {
            let expired = block_num - self.params.max_undo_history;
            if let Some(old) = self.db.get_main_chain_id(expired)? {
                self.db.del_undo(&old)?;
            }
        }

        debug!(%id, %block_num, txs = block.transactions.len(), "extended chain");
        Ok(())
    }

    /// Reverts the head block, handing its transactions back to the pool.
    pub fn pop_block(&mut self) -> ChainResult<Block> {
        let res = self.pop_head();
        self.revalidate_pool();
        res
    }

    fn pop_head(&mut self) -> ChainResult<Block> {
        if self.head.block_num == 0 {
            return Err(ChainError::NothingToPop);
        }
        let id = self.head.id;
        let undo = self.db.get_undo(&id)?.ok_or(ChainError::MissingUndo(id))?;
        let block = self.load_block(&id)?;

        let previous = if block.header.previous == BlockId::zero() {
            ChainHead::genesis(self.genesis_time)
        } else {
            ChainHead::of(&self.load_block(&block.header.previous)?.header)
        };

        undo.apply_to(&mut self.store);
        self.db.pop_main_chain()?;
        self.db.del_undo(&id)?;
        self.head = previous;
        self.store.set_now(previous.timestamp);
        self.forks.mark_included(id, false);
        self.pool.requeue(block.transactions.iter().cloned());

        debug!(%id, block_num = %block.block_num(), "popped block");
        Ok(block)
    }

    /// Pops back to where the fork ending in `id` leaves the main chain and
    /// applies the fork.  Any failure puts the original branch back.
    fn switch_to_fork(&mut self, id: BlockId) -> ChainResult<()> {
        let db = &self.db;
        let history = self
            .forks
            .fork_history(id, |b| {
                db.get_block(b).ok().flatten().map(|blk| blk.header.previous)
            })
            .ok_or(ChainError::Unlinked(id))?;
        let (fork_point, new_blocks) = match history.split_last() {
            Some((p, rest)) => (*p, rest),
            None => return Err(ChainError::Unlinked(id)),
        };

        // make sure every pop can be undone before touching anything
        let mut old_branch = Vec::new();
        let mut cur = self.head.id;
        while cur != fork_point && cur != BlockId::zero() {
            if self.db.get_undo(&cur)?.is_none() {
                return Err(ChainError::ForkSwitchFailed {
                    block: id,
                    reason: Box::new(ChainError::MissingUndo(cur)),
                });
            }
            old_branch.push(cur);
            cur = self.load_block(&cur)?.header.previous;
        }

        info!(
            from = %self.head.id,
            to = %id,
            %fork_point,
            popped = old_branch.len(),
            applied = new_blocks.len(),
            "switching to fork"
        );
        for _ in &old_branch {
            self.pop_head()?;
        }

        let now = self.clock.now();
        for bid in new_blocks.iter().rev() {
            let block = self.load_block(bid)?;
            if let Err(e) = self.extend_chain(&block, now) {
                warn!(block = %bid, %e, "fork block failed, restoring original branch");
                self.forks.mark_invalid(*bid);
                while self.head.id != fork_point {
                    self.pop_head()?;
                }
                for old in old_branch.iter().rev() {
                    let block = self.load_block(old)?;
                    self.extend_chain(&block, block.timestamp())?;
                }
                return Err(ChainError::ForkSwitchFailed {
                    block: *bid,
                    reason: Box::new(e),
                });
            }
        }
        Ok(())
    }

    /// Checks a transaction against the head and the pool, and queues it.
    pub fn submit_transaction(&mut self, trx: SignedTransaction) -> ChainResult<TxId> {
        let block_num = self.head.block_num + 1;
        Ok(self
            .pool
            .admit(&mut self.store, &self.params, block_num, trx)?)
    }

    fn revalidate_pool(&mut self) {
        let block_num = self.head.block_num + 1;
        self.pool
            .revalidate(&mut self.store, &self.params, block_num);
    }

    /// Builds and signs the next block from the pool, highest fee first,
    /// leaving out anything that no longer evaluates or does not fit.
    pub fn generate_block(
        &mut self,
        timestamp: Timestamp,
        signer: &SecretKey,
        previous_secret: Buf20,
        next_secret_hash: Buf20,
    ) -> ChainResult<Block> {
        let block_num = self.head.block_num + 1;
        let mut transactions = Vec::new();
        let mut size = 0;

        let mut state = PendingState::with_now(&mut self.store, timestamp);
        for entry in self.pool.iter() {
            if size + entry.size > self.params.max_block_size {
                continue;
            }
            let index = transactions.len() as u32;
            match evaluate_transaction(&mut state, &self.params, block_num, &entry.trx, index) {
                Ok(_) => {
                    size += entry.size;
                    transactions.push(entry.trx.clone());
                }
                Err(e) => debug!(id = %entry.id(), %e, "leaving transaction out of block"),
            }
        }
        drop(state);

        let digest = Block::compute_transaction_digest(&transactions);
        let mut header = BlockHeader::new(
            self.head.id,
            block_num,
            timestamp,
            digest,
            previous_secret,
            next_secret_hash,
        );
        header.sign(signer);
        debug!(id = %header.id(), %block_num, txs = transactions.len(), "generated block");
        Ok(Block::new(header, transactions))
    }
}

#[cfg(test)]
mod tests {
    use dexchain_db::StubBlockDb;
    use dexchain_ledger::{LedgerView, LedgerViewExt};
    use dexchain_params::constants::PRECISION;
    use dexchain_primitives::{amount::Amount, ids::AssetId};
    use dexchain_test_utils::{
        keys::{address, secret},
        ledger::balance_of,
        tx::{deposit, signed, withdraw},
    };

    use super::*;
    use crate::{
        errors::HeaderError,
        test_support::{open_chain, open_chain_with, produce, resign, test_params, TestChain},
    };

    fn transfer(
        chain: &TestChain,
        from: u8,
        to: u8,
        amount: Amount,
        fee: Amount,
    ) -> SignedTransaction {
        let ops = vec![
            withdraw(address(from), AssetId::BASE, amount + fee),
            deposit(address(to), AssetId::BASE, amount),
        ];
        signed(ops, &[from], chain.store().now(), &chain.store().chain_id())
    }

    fn produce_and_push(chain: &mut TestChain, slots: u32) -> Block {
        let block = produce(chain, slots);
        assert_eq!(chain.push_block(block.clone()).unwrap(), BlockStatus::MainChain);
        block
    }

    #[test]
    fn test_extend_applies_transactions_and_pay() {
        let mut chain = open_chain(Arc::default());
        let trx = transfer(&chain, 1, 9, 5 * PRECISION, PRECISION);
        chain.submit_transaction(trx).unwrap();
        assert_eq!(chain.pool().len(), 1);

        let block = produce_and_push(&mut chain, 1);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(chain.head().block_num, 1);
        assert_eq!(chain.head().id, block.id());
        assert_eq!(chain.store().now(), block.timestamp());
        assert_eq!(
            balance_of(chain.store(), address(9), AssetId::BASE),
            5 * PRECISION
        );
        assert!(chain.pool().is_empty());

        let producer = chain
            .store()
            .delegate_accounts()
            .into_iter()
            .find(|d| d.delegate_info.as_ref().is_some_and(|s| s.blocks_produced == 1))
            .unwrap();
        let stats = producer.delegate_info.unwrap();
        assert_eq!(stats.total_paid, chain.params().block_reward(1));
        assert_eq!(stats.total_burned, 0);
    }

    #[test]
    fn test_pop_restores_ledger_and_requeues() {
        let mut chain = open_chain(Arc::default());
        let first = produce_and_push(&mut chain, 1);
        let before = chain.store().clone();

        let trx = transfer(&chain, 2, 9, PRECISION, PRECISION);
        let trx_id = chain.submit_transaction(trx).unwrap();
        produce_and_push(&mut chain, 1);
        assert!(chain.pool().is_empty());

        let popped = chain.pop_block().unwrap();
        assert_eq!(popped.transactions.len(), 1);
        assert!(chain.store().same_ledger(&before));
        assert_eq!(*chain.head(), ChainHead::of(&first.header));
        assert!(chain.pool().contains(&trx_id));
        assert_eq!(chain.block_status(&popped.id()), Some(BlockStatus::ForkedOff));

        chain.pop_block().unwrap();
        assert_eq!(chain.head().block_num, 0);
        assert!(matches!(chain.pop_block(), Err(ChainError::NothingToPop)));
    }

    #[test]
    fn test_switch_to_longer_fork() {
        let mut a = open_chain(Arc::default());
        let mut b = open_chain(Arc::default());

        let a1 = produce_and_push(&mut a, 1);
        let a2 = produce_and_push(&mut a, 1);

        // b skips the first slot, so its branch differs from the start
        let fork: Vec<Block> = [2, 1, 1].map(|s| produce_and_push(&mut b, s)).into();
        a.clock().set(fork[2].timestamp());

        assert_eq!(a.push_block(fork[0].clone()).unwrap(), BlockStatus::Linked);
        assert_eq!(a.push_block(fork[1].clone()).unwrap(), BlockStatus::Linked);
        assert_eq!(a.head().id, a2.id());

        assert_eq!(a.push_block(fork[2].clone()).unwrap(), BlockStatus::MainChain);
        assert_eq!(a.head(), b.head());
        assert!(a.store().same_ledger(b.store()));
        assert_eq!(a.block_status(&a1.id()), Some(BlockStatus::ForkedOff));
        assert_eq!(a.block_status(&a2.id()), Some(BlockStatus::ForkedOff));
        assert_eq!(a.main_chain_id(1).unwrap(), Some(fork[0].id()));
    }

    #[test]
    fn test_failed_fork_switch_restores_head() {
        let mut a = open_chain(Arc::default());
        let mut b = open_chain(Arc::default());

        produce_and_push(&mut a, 1);
        produce_and_push(&mut a, 1);
        let head = *a.head();
        let before = a.store().clone();

        let b1 = produce_and_push(&mut b, 2);
        let b2 = produce_and_push(&mut b, 1);
        let mut b3 = produce(&mut b, 1);
        // unfunded spend makes the block fail evaluation
        let bad = signed(
            vec![withdraw(address(9), AssetId::BASE, 10)],
            &[9],
            b.store().now(),
            &b.store().chain_id(),
        );
        b3.transactions.push(bad);
        resign(&b, &mut b3);
        a.clock().set(b3.timestamp());

        a.push_block(b1).unwrap();
        a.push_block(b2.clone()).unwrap();
        let err = a.push_block(b3.clone()).unwrap_err();
        assert!(matches!(err, ChainError::ForkSwitchFailed { block, .. } if block == b3.id()));

        assert_eq!(*a.head(), head);
        assert!(a.store().same_ledger(&before));
        assert_eq!(a.block_status(&b3.id()), Some(BlockStatus::Invalid));
        assert_eq!(a.block_status(&b2.id()), Some(BlockStatus::ForkedOff));
        assert!(matches!(
            a.push_block(b3),
            Err(ChainError::KnownInvalid(_))
        ));
    }

    #[test]
    fn test_out_of_order_blocks_link_later() {
        let mut a = open_chain(Arc::default());
        let mut b = open_chain(Arc::default());
        let b1 = produce_and_push(&mut b, 1);
        let b2 = produce_and_push(&mut b, 1);
        a.clock().set(b2.timestamp());

        assert_eq!(a.push_block(b2.clone()).unwrap(), BlockStatus::Received);
        assert_eq!(a.head().block_num, 0);

        a.push_block(b1).unwrap();
        assert_eq!(a.head().id, b2.id());
        assert_eq!(a.block_status(&b2.id()), Some(BlockStatus::MainChain));
    }

    #[test]
    fn test_rejected_header_marks_block_invalid() {
        let mut chain = open_chain(Arc::default());
        let mut block = produce(&mut chain, 1);
        // re-signed by a delegate that does not own the slot
        block.header.sign(&secret(7));

        let err = chain.push_block(block.clone()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Header(HeaderError::WrongSigner(_))
        ));
        assert_eq!(chain.block_status(&block.id()), Some(BlockStatus::Invalid));
        assert_eq!(chain.head().block_num, 0);
    }

    #[test]
    fn test_undo_window() {
        let db = Arc::new(StubBlockDb::new());
        let params = ChainParams {
            max_undo_history: 2,
            ..test_params()
        };
        let mut chain = open_chain_with(db.clone(), params);
        let blocks: Vec<Block> = (0..4).map(|_| produce_and_push(&mut chain, 1)).collect();

        assert!(db.get_undo(&blocks[0].id()).unwrap().is_none());
        assert!(db.get_undo(&blocks[1].id()).unwrap().is_none());
        assert!(db.get_undo(&blocks[3].id()).unwrap().is_some());

        chain.pop_block().unwrap();
        chain.pop_block().unwrap();
        assert!(matches!(
            chain.pop_block(),
            Err(ChainError::MissingUndo(id)) if id == blocks[1].id()
        ));
    }

    #[test]
    fn test_replay_and_rotation() {
        let db = Arc::new(StubBlockDb::new());
        let mut chain = open_chain(db.clone());
        let trx = transfer(&chain, 3, 9, PRECISION, PRECISION);
        chain.submit_transaction(trx).unwrap();
        for _ in 0..4 {
            produce_and_push(&mut chain, 1);
        }

        let mut active = chain.store().active_delegates();
        active.sort();
        let ids: Vec<_> = chain.store().delegate_accounts().iter().map(|d| d.id).collect();
        assert_eq!(active, ids);

        let reopened = open_chain(db);
        assert_eq!(reopened.head(), chain.head());
        assert!(reopened.store().same_ledger(chain.store()));
        assert_eq!(
            reopened.store().active_delegates(),
            chain.store().active_delegates()
        );
    }

    #[test]
    fn test_generate_block_orders_by_fee() {
        let mut chain = open_chain(Arc::default());
        let cheap = transfer(&chain, 1, 9, PRECISION, PRECISION);
        let rich = transfer(&chain, 2, 9, PRECISION, 3 * PRECISION);
        chain.submit_transaction(cheap.clone()).unwrap();
        chain.submit_transaction(rich.clone()).unwrap();

        let block = produce(&mut chain, 1);
        assert_eq!(block.transactions, vec![rich, cheap]);
        assert!(block.has_valid_transaction_digest());

        // generating leaves both the ledger and the pool alone
        assert_eq!(chain.pool().len(), 2);
        assert_eq!(balance_of(chain.store(), address(9), AssetId::BASE), 0);
    }
}
