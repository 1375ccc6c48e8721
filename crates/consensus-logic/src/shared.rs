//! Handle for sharing one chain between the block, transaction and query
//! paths.

use std::sync::Arc;

use dexchain_db::BlockDatabase;
use dexchain_state::{
    block::Block,
    transaction::{SignedTransaction, TxId},
};
use parking_lot::RwLock;
use tracing::*;

use crate::{
    chain::{ChainDatabase, ChainHead},
    clock::Clock,
    errors::ChainResult,
    fork_tracker::BlockStatus,
};

/// Cloneable handle to a [`ChainDatabase`].  Writers are serialized, readers
/// see the chain between two writes.
#[derive(Debug)]
pub struct SharedChain<D: BlockDatabase, C: Clock> {
    inner: Arc<RwLock<ChainDatabase<D, C>>>,
}

impl<D: BlockDatabase, C: Clock> Clone for SharedChain<D, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: BlockDatabase, C: Clock> SharedChain<D, C> {
    pub fn new(chain: ChainDatabase<D, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn push_block(&self, block: Block) -> ChainResult<BlockStatus> {
        let id = block.id();
        let res = self.inner.write().push_block(block);
        if let Err(e) = &res {
            debug!(%id, %e, "block not accepted");
        }
        res
    }

    pub fn submit_transaction(&self, trx: SignedTransaction) -> ChainResult<TxId> {
        self.inner.write().submit_transaction(trx)
    }

    pub fn pop_block(&self) -> ChainResult<Block> {
        self.inner.write().pop_block()
    }

    pub fn head(&self) -> ChainHead {
        *self.inner.read().head()
    }

    /// Runs `f` with the chain read locked.
    pub fn read<R>(&self, f: impl FnOnce(&ChainDatabase<D, C>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` with the chain write locked.
    pub fn write<R>(&self, f: impl FnOnce(&mut ChainDatabase<D, C>) -> R) -> R {
        f(&mut self.inner.write())
    }
}
