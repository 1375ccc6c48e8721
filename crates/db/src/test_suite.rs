//! Behavior every [`BlockDatabase`] backend shares.

use dexchain_ledger::StateDelta;
use dexchain_primitives::{
    buf::{Buf20, Buf32},
    time::Timestamp,
};
use dexchain_state::{
    block::{Block, BlockHeader, BlockId},
    property::{PropertyId, PropertyValue},
};

use crate::{traits::BlockDatabase, DbError};

pub(crate) fn block(previous: BlockId, block_num: u32) -> Block {
    let header = BlockHeader::new(
        previous,
        block_num,
        Timestamp::from_secs(block_num * 10),
        Buf32::zero(),
        Buf20::zero(),
        Buf20::zero(),
    );
    Block::new(header, Vec::new())
}

pub(crate) fn test_blocks(db: &impl BlockDatabase) {
    let b1 = block(BlockId::zero(), 1);
    let id = b1.id();
    assert!(!db.has_block(&id).unwrap());

    db.put_block(&b1).unwrap();
    db.put_block(&b1).unwrap();
    assert_eq!(db.get_block(&id).unwrap(), Some(b1));
    assert_eq!(db.get_children(&BlockId::zero()).unwrap(), vec![id]);

    assert!(db.del_block(&id).unwrap());
    assert!(!db.del_block(&id).unwrap());
    assert!(!db.has_block(&id).unwrap());
    assert!(db.get_children(&BlockId::zero()).unwrap().is_empty());
}

pub(crate) fn test_children(db: &impl BlockDatabase) {
    let root = block(BlockId::zero(), 1);
    let a = block(root.id(), 2);
    let mut b = block(root.id(), 2);
    b.header.timestamp = Timestamp::from_secs(30);
    for blk in [&root, &a, &b] {
        db.put_block(blk).unwrap();
    }

    let kids = db.get_children(&root.id()).unwrap();
    assert_eq!(kids.len(), 2);
    assert!(kids.contains(&a.id()) && kids.contains(&b.id()));

    db.del_block(&a.id()).unwrap();
    assert_eq!(db.get_children(&root.id()).unwrap(), vec![b.id()]);
}

pub(crate) fn test_undo(db: &impl BlockDatabase) {
    let b1 = block(BlockId::zero(), 1);
    let mut undo = StateDelta::default();
    undo.properties
        .insert(PropertyId::FeeRate, Some(PropertyValue::Amount(5)));
    undo.properties.insert(PropertyId::LastAssetId, None);

    db.put_block(&b1).unwrap();
    db.put_undo(&b1.id(), &undo).unwrap();
    assert_eq!(db.get_undo(&b1.id()).unwrap(), Some(undo));

    db.del_undo(&b1.id()).unwrap();
    assert_eq!(db.get_undo(&b1.id()).unwrap(), None);

    // deleting a block drops its undo too
    db.put_undo(&b1.id(), &StateDelta::default()).unwrap();
    db.del_block(&b1.id()).unwrap();
    assert_eq!(db.get_undo(&b1.id()).unwrap(), None);
}

pub(crate) fn test_main_chain(db: &impl BlockDatabase) {
    assert_eq!(db.main_chain_tip().unwrap(), None);
    assert_eq!(db.pop_main_chain().unwrap(), None);

    let b1 = block(BlockId::zero(), 1);
    let b2 = block(b1.id(), 2);
    assert_eq!(
        db.push_main_chain(2, b2.id()).unwrap_err(),
        DbError::OooInsert(2, 0)
    );

    db.push_main_chain(1, b1.id()).unwrap();
    db.push_main_chain(2, b2.id()).unwrap();
    assert_eq!(db.main_chain_tip().unwrap(), Some((2, b2.id())));
    assert_eq!(db.get_main_chain_id(1).unwrap(), Some(b1.id()));

    assert_eq!(db.pop_main_chain().unwrap(), Some((2, b2.id())));
    assert_eq!(db.main_chain_tip().unwrap(), Some((1, b1.id())));
    assert_eq!(db.get_main_chain_id(2).unwrap(), None);
}
