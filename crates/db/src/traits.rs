//! Database interface the chain orchestrator is written against.
//!
//! Operations are NOT VALIDATED at this level, the orchestrator decides what
//! is linked and what is on the main chain.

use dexchain_ledger::StateDelta;
use dexchain_state::block::{Block, BlockId};

use crate::DbResult;

pub trait BlockDatabase: Send + Sync + 'static {
    /// Stores a block under its id and indexes it as a child of its
    /// previous block.  Storing a block twice is a no-op.
    fn put_block(&self, block: &Block) -> DbResult<()>;

    fn get_block(&self, id: &BlockId) -> DbResult<Option<Block>>;

    fn has_block(&self, id: &BlockId) -> DbResult<bool> {
        Ok(self.get_block(id)?.is_some())
    }

    /// Deletes a block and its undo record.  Returns whether it existed.
    fn del_block(&self, id: &BlockId) -> DbResult<bool>;

    /// Ids of the known blocks built on `previous`.
    fn get_children(&self, previous: &BlockId) -> DbResult<Vec<BlockId>>;

    /// Stores the delta that reverts a block's writes.
    fn put_undo(&self, id: &BlockId, undo: &StateDelta) -> DbResult<()>;

    fn get_undo(&self, id: &BlockId) -> DbResult<Option<StateDelta>>;

    /// Drops undo records that fell out of the undo window.
    fn del_undo(&self, id: &BlockId) -> DbResult<()>;

    /// Extends the main chain index.  `block_num` must be one above the
    /// current tip, or 1 on an empty index.
    fn push_main_chain(&self, block_num: u32, id: BlockId) -> DbResult<()>;

    /// Removes and returns the tip of the main chain index.
    fn pop_main_chain(&self) -> DbResult<Option<(u32, BlockId)>>;

    fn get_main_chain_id(&self, block_num: u32) -> DbResult<Option<BlockId>>;

    fn main_chain_tip(&self) -> DbResult<Option<(u32, BlockId)>>;
}
