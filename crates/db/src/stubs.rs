//! In memory [`BlockDatabase`] for tests and throwaway nodes.

use std::collections::{BTreeMap, HashMap};

use dexchain_ledger::StateDelta;
use dexchain_state::block::{Block, BlockId};
use parking_lot::Mutex;

use crate::{traits::BlockDatabase, DbError, DbResult};

#[derive(Debug, Default)]
pub struct StubBlockDb {
    blocks: Mutex<HashMap<BlockId, Block>>,
    children: Mutex<HashMap<BlockId, Vec<BlockId>>>,
    undo: Mutex<HashMap<BlockId, StateDelta>>,
    main_chain: Mutex<BTreeMap<u32, BlockId>>,
}

impl StubBlockDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockDatabase for StubBlockDb {
    fn put_block(&self, block: &Block) -> DbResult<()> {
        let id = block.id();
        self.blocks.lock().insert(id, block.clone());

        let mut children = self.children.lock();
        let kids = children.entry(block.header.previous).or_default();
        if !kids.contains(&id) {
            kids.push(id);
        }
        Ok(())
    }

    fn get_block(&self, id: &BlockId) -> DbResult<Option<Block>> {
        Ok(self.blocks.lock().get(id).cloned())
    }

    fn del_block(&self, id: &BlockId) -> DbResult<bool> {
        let Some(block) = self.blocks.lock().remove(id) else {
            return Ok(false);
        };

        {
            let mut children = self.children.lock();
            if let Some(kids) = children.get_mut(&block.header.previous) {
                kids.retain(|k| k != id);
                if kids.is_empty() {
                    children.remove(&block.header.previous);
                }
            }
        }

        self.undo.lock().remove(id);
        Ok(true)
    }

    fn get_children(&self, previous: &BlockId) -> DbResult<Vec<BlockId>> {
        Ok(self
            .children
            .lock()
            .get(previous)
            .cloned()
            .unwrap_or_default())
    }

    fn put_undo(&self, id: &BlockId, undo: &StateDelta) -> DbResult<()> {
        self.undo.lock().insert(*id, undo.clone());
        Ok(())
    }

    fn get_undo(&self, id: &BlockId) -> DbResult<Option<StateDelta>> {
        Ok(self.undo.lock().get(id).cloned())
    }

    fn del_undo(&self, id: &BlockId) -> DbResult<()> {
        self.undo.lock().remove(id);
        Ok(())
    }

    fn push_main_chain(&self, block_num: u32, id: BlockId) -> DbResult<()> {
        let mut chain = self.main_chain.lock();
        let tip = chain.last_key_value().map_or(0, |(n, _)| *n);
        if block_num != tip + 1 {
            return Err(DbError::OooInsert(block_num, tip));
        }
        chain.insert(block_num, id);
        Ok(())
    }

    fn pop_main_chain(&self) -> DbResult<Option<(u32, BlockId)>> {
        Ok(self.main_chain.lock().pop_last())
    }

    fn get_main_chain_id(&self, block_num: u32) -> DbResult<Option<BlockId>> {
        Ok(self.main_chain.lock().get(&block_num).copied())
    }

    fn main_chain_tip(&self) -> DbResult<Option<(u32, BlockId)>> {
        Ok(self
            .main_chain
            .lock()
            .last_key_value()
            .map(|(n, id)| (*n, *id)))
    }
}
