//! Sled backed [`BlockDatabase`].

use std::{marker::PhantomData, path::Path};

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_ledger::StateDelta;
use dexchain_state::block::{Block, BlockId};
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use tracing::*;

use crate::{macros::define_tree, traits::BlockDatabase, DbError, DbResult};

/// Key encoding.  Integers are big endian so sled's byte order is numeric
/// order and the last entry of a tree is the highest key.
pub(crate) trait KeyCodec: Sized {
    fn encode_key(&self) -> Vec<u8>;
    fn decode_key(data: &[u8]) -> DbResult<Self>;
}

impl KeyCodec for u32 {
    fn encode_key(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }

    fn decode_key(data: &[u8]) -> DbResult<Self> {
        let arr: [u8; 4] = data
            .try_into()
            .map_err(|_| DbError::Codec(format!("u32 key of {} bytes", data.len())))?;
        Ok(u32::from_be_bytes(arr))
    }
}

impl KeyCodec for BlockId {
    fn encode_key(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    fn decode_key(data: &[u8]) -> DbResult<Self> {
        BlockId::try_from(data).map_err(|e| DbError::Codec(e.to_string()))
    }
}

pub(crate) trait Schema {
    const TREE_NAME: &'static str;
    type Key: KeyCodec;
    type Value: BorshSerialize + BorshDeserialize;
}

fn encode_value<T: BorshSerialize>(value: &T) -> DbResult<Vec<u8>> {
    borsh::to_vec(value).map_err(|e| DbError::Codec(e.to_string()))
}

fn decode_value<T: BorshDeserialize>(raw: &[u8]) -> DbResult<T> {
    borsh::from_slice(raw).map_err(|e| DbError::Codec(e.to_string()))
}

fn from_tx_error(e: TransactionError<DbError>) -> DbError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    }
}

/// A sled tree read and written through its schema's codecs.
#[derive(Debug)]
struct TypedTree<S: Schema> {
    tree: sled::Tree,
    _schema: PhantomData<S>,
}

impl<S: Schema> TypedTree<S> {
    fn open(db: &sled::Db) -> DbResult<Self> {
        Ok(Self {
            tree: db.open_tree(S::TREE_NAME)?,
            _schema: PhantomData,
        })
    }

    fn get(&self, key: &S::Key) -> DbResult<Option<S::Value>> {
        match self.tree.get(key.encode_key())? {
            Some(raw) => Ok(Some(decode_value(&raw)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, key: &S::Key, value: &S::Value) -> DbResult<()> {
        self.tree.insert(key.encode_key(), encode_value(value)?)?;
        Ok(())
    }

    fn remove(&self, key: &S::Key) -> DbResult<bool> {
        Ok(self.tree.remove(key.encode_key())?.is_some())
    }

    fn last(&self) -> DbResult<Option<(S::Key, S::Value)>> {
        match self.tree.last()? {
            Some((k, v)) => Ok(Some((S::Key::decode_key(&k)?, decode_value(&v)?))),
            None => Ok(None),
        }
    }

    fn pop_last(&self) -> DbResult<Option<(S::Key, S::Value)>> {
        match self.tree.pop_max()? {
            Some((k, v)) => Ok(Some((S::Key::decode_key(&k)?, decode_value(&v)?))),
            None => Ok(None),
        }
    }
}

define_tree!(
    /// Blocks by id, main chain or not.
    (BlockSchema) BlockId => Block
);

define_tree!(
    /// Deltas that revert applied blocks.
    (UndoSchema) BlockId => StateDelta
);

define_tree!(
    /// Main chain block ids by block number.
    (MainChainSchema) u32 => BlockId
);

define_tree!(
    /// Known blocks built on a block.
    (ChildrenSchema) BlockId => Vec<BlockId>
);

#[derive(Debug)]
pub struct SledBlockDb {
    db: sled::Db,
    blocks: TypedTree<BlockSchema>,
    undo: TypedTree<UndoSchema>,
    main_chain: TypedTree<MainChainSchema>,
    children: TypedTree<ChildrenSchema>,
}

impl SledBlockDb {
    /// Opens or creates the database in `path`.
    pub fn open(path: &Path) -> DbResult<Self> {
        debug!(path = %path.display(), "opening block database");
        Self::from_db(sled::open(path)?)
    }

    /// Database removed from disk when dropped.
    pub fn temporary() -> DbResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> DbResult<Self> {
        Ok(Self {
            blocks: TypedTree::open(&db)?,
            undo: TypedTree::open(&db)?,
            main_chain: TypedTree::open(&db)?,
            children: TypedTree::open(&db)?,
            db,
        })
    }

    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl BlockDatabase for SledBlockDb {
    fn put_block(&self, block: &Block) -> DbResult<()> {
        let id = block.id();
        let key = id.encode_key();
        let value = encode_value(block)?;
        let prev_key = block.header.previous.encode_key();

        (&self.blocks.tree, &self.children.tree)
            .transaction(|(bt, ct)| {
                bt.insert(key.as_slice(), value.as_slice())?;

                let mut kids: Vec<BlockId> = match ct.get(prev_key.as_slice())? {
                    Some(raw) => decode_value(&raw).map_err(ConflictableTransactionError::Abort)?,
                    None => Vec::new(),
                };
                if !kids.contains(&id) {
                    kids.push(id);
                    let raw = encode_value(&kids).map_err(ConflictableTransactionError::Abort)?;
                    ct.insert(prev_key.as_slice(), raw)?;
                }
                Ok(())
            })
            .map_err(from_tx_error)
    }

    fn get_block(&self, id: &BlockId) -> DbResult<Option<Block>> {
        self.blocks.get(id)
    }

    fn del_block(&self, id: &BlockId) -> DbResult<bool> {
        let Some(block) = self.blocks.get(id)? else {
            return Ok(false);
        };
        let previous = block.header.previous;
        if let Some(mut kids) = self.children.get(&previous)? {
            kids.retain(|k| k != id);
            if kids.is_empty() {
                self.children.remove(&previous)?;
            } else {
                self.children.insert(&previous, &kids)?;
            }
        }
        self.undo.remove(id)?;
        self.blocks.remove(id)
    }

    fn get_children(&self, previous: &BlockId) -> DbResult<Vec<BlockId>> {
        Ok(self.children.get(previous)?.unwrap_or_default())
    }

    fn put_undo(&self, id: &BlockId, undo: &StateDelta) -> DbResult<()> {
        self.undo.insert(id, undo)
    }

    fn get_undo(&self, id: &BlockId) -> DbResult<Option<StateDelta>> {
        self.undo.get(id)
    }

    fn del_undo(&self, id: &BlockId) -> DbResult<()> {
        self.undo.remove(id)?;
        Ok(())
    }

    fn push_main_chain(&self, block_num: u32, id: BlockId) -> DbResult<()> {
        let tip = self.main_chain.last()?.map_or(0, |(n, _)| n);
        if block_num != tip + 1 {
            return Err(DbError::OooInsert(block_num, tip));
        }
        self.main_chain.insert(&block_num, &id)
    }

    fn pop_main_chain(&self) -> DbResult<Option<(u32, BlockId)>> {
        self.main_chain.pop_last()
    }

    fn get_main_chain_id(&self, block_num: u32) -> DbResult<Option<BlockId>> {
        self.main_chain.get(&block_num)
    }

    fn main_chain_tip(&self) -> DbResult<Option<(u32, BlockId)>> {
        self.main_chain.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_suite;

    fn setup() -> SledBlockDb {
        SledBlockDb::temporary().expect("open temporary db")
    }

    #[test]
    fn test_blocks() {
        test_suite::test_blocks(&setup());
    }

    #[test]
    fn test_children() {
        test_suite::test_children(&setup());
    }

    #[test]
    fn test_undo() {
        test_suite::test_undo(&setup());
    }

    #[test]
    fn test_main_chain() {
        test_suite::test_main_chain(&setup());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let block = test_suite::block(Default::default(), 1);
        {
            let db = SledBlockDb::open(dir.path()).unwrap();
            db.put_block(&block).unwrap();
            db.push_main_chain(1, block.id()).unwrap();
            db.flush().unwrap();
        }

        let db = SledBlockDb::open(dir.path()).unwrap();
        assert_eq!(db.get_block(&block.id()).unwrap(), Some(block.clone()));
        assert_eq!(db.main_chain_tip().unwrap(), Some((1, block.id())));
    }

    #[test]
    fn test_u32_keys_sort_numerically() {
        let db = setup();
        for n in 1..=300u32 {
            db.push_main_chain(n, test_suite::block(Default::default(), n).id())
                .unwrap();
        }
        assert_eq!(db.main_chain_tip().unwrap().map(|(n, _)| n), Some(300));
        assert!(u32::decode_key(&[1, 2]).is_err());
    }
}
