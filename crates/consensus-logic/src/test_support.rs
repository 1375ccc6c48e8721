//! Chains driven by test delegates.

use std::sync::Arc;

use dexchain_db::StubBlockDb;
use dexchain_ledger::LedgerViewExt;
use dexchain_mempool::MempoolConfig;
use dexchain_params::{ChainParams, ForkSchedule};
use dexchain_primitives::{buf::Buf20, hash::ripemd160, ids::AccountId};
use dexchain_state::block::Block;
use dexchain_test_utils::{genesis::test_genesis, keys::secret};

use crate::{chain::ChainDatabase, clock::ManualClock, schedule::signing_delegate_id};

pub(crate) type TestChain = ChainDatabase<StubBlockDb, ManualClock>;

pub(crate) fn test_params() -> ChainParams {
    ChainParams {
        num_delegates: 3,
        forks: ForkSchedule::fixed(7),
        ..Default::default()
    }
}

pub(crate) fn open_chain(db: Arc<StubBlockDb>) -> TestChain {
    open_chain_with(db, test_params())
}

pub(crate) fn open_chain_with(db: Arc<StubBlockDb>, params: ChainParams) -> TestChain {
    let genesis = test_genesis(3);
    let clock = Arc::new(ManualClock::new(genesis.timestamp));
    ChainDatabase::open(db, &genesis, params, MempoolConfig::default(), clock)
        .expect("open test chain")
}

/// Each test delegate reveals the same secret every round.
pub(crate) fn delegate_secret(id: AccountId) -> Buf20 {
    Buf20::new([id.inner() as u8; 20])
}

fn scheduled(chain: &TestChain, block: &Block) -> AccountId {
    let interval = chain.params().block_interval_sec;
    signing_delegate_id(&chain.store().active_delegates(), block.timestamp(), interval)
        .expect("scheduled delegate")
}

/// Generates the block `slots` slots after the head, signed by the delegate
/// owning that slot, and moves the clock there.
pub(crate) fn produce(chain: &mut TestChain, slots: u32) -> Block {
    let interval = chain.params().block_interval_sec;
    let ts = chain.head().timestamp.saturating_add_secs(slots * interval);
    let producer = signing_delegate_id(&chain.store().active_delegates(), ts, interval)
        .expect("scheduled delegate");
    chain.clock().set(ts);

    let revealed = delegate_secret(producer);
    chain
        .generate_block(
            ts,
            &secret(producer.inner() as u8),
            revealed,
            ripemd160(revealed.as_slice()),
        )
        .expect("generate block")
}

/// Fixes up digest and signature after a test tampered with a block.
pub(crate) fn resign(chain: &TestChain, block: &mut Block) {
    block.header.transaction_digest = Block::compute_transaction_digest(&block.transactions);
    let producer = scheduled(chain, block);
    block.header.sign(&secret(producer.inner() as u8));
}
