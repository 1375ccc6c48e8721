//! Applying a single block on top of the head.
//!
//! Everything a block does is written into one overlay over the committed
//! ledger, so a failure anywhere leaves the ledger untouched.  On success the
//! caller gets the overlay's writes along with the delta that reverts them.

use dexchain_chaintsn::evaluate_transaction;
use dexchain_ledger::{LedgerView, LedgerViewExt, PendingState, StateDelta};
use dexchain_market::execute_dirty_markets;
use dexchain_params::ChainParams;
use dexchain_primitives::{
    amount::Amount,
    hash::ripemd160,
    ids::{AccountId, AssetId},
    time::Timestamp,
};
use dexchain_state::{
    block::{Block, BlockHeader},
    property::{PropertyId, PropertyValue},
    transaction::SignedTransaction,
};
use tracing::*;

use crate::{
    chain::ChainHead,
    errors::{ChainError, ChainResult, HeaderError},
    schedule::{next_random_seed, shuffle_delegates, signing_delegate_id, top_delegates},
};

#[derive(Debug)]
pub(crate) struct AppliedBlock {
    /// Writes of the block, to be committed.
    pub(crate) delta: StateDelta,
    /// Restores the ledger as it was before the block.
    pub(crate) undo: StateDelta,
}

pub(crate) fn block_size(block: &Block) -> usize {
    block
        .transactions
        .iter()
        .map(SignedTransaction::data_size)
        .sum()
}

/// Checks a header against the head and the delegate schedule.  Returns the
/// delegate that produced the block.
pub(crate) fn verify_header<V: LedgerView + ?Sized>(
    view: &V,
    params: &ChainParams,
    head: &ChainHead,
    block: &Block,
    local_now: Timestamp,
) -> Result<AccountId, HeaderError> {
    let h = &block.header;
    let interval = params.block_interval_sec;

    if h.block_num != head.block_num + 1 {
        return Err(HeaderError::NotSequential {
            got: h.block_num,
            head: head.block_num,
        });
    }
    if h.previous != head.id {
        return Err(HeaderError::WrongPrevious {
            got: h.previous,
            head: head.id,
        });
    }
    if !h.timestamp.is_aligned(interval) {
        return Err(HeaderError::UnalignedTimestamp(h.timestamp));
    }
    if h.timestamp <= head.timestamp {
        return Err(HeaderError::TimeInPast {
            block: h.timestamp,
            head: head.timestamp,
        });
    }
    if h.timestamp > local_now.saturating_add_secs(2 * interval) {
        return Err(HeaderError::TimeInFuture {
            block: h.timestamp,
            now: local_now,
        });
    }
    if !block.has_valid_transaction_digest() {
        return Err(HeaderError::InvalidDigest);
    }
    let size = block_size(block);
    if size > params.max_block_size {
        return Err(HeaderError::TooLarge {
            size,
            limit: params.max_block_size,
        });
    }

    let active = view.active_delegates();
    let producer = signing_delegate_id(&active, h.timestamp, interval)
        .ok_or(HeaderError::NoActiveDelegates)?;
    let key = view
        .get_account(producer)
        .and_then(|a| a.signing_key_at(h.block_num))
        .ok_or(HeaderError::NoSigningKey(producer))?;
    if h.signee()? != key {
        return Err(HeaderError::WrongSigner(producer));
    }
    Ok(producer)
}

/// Applies `block` over `view` without writing to it.
pub(crate) fn apply_block<V: LedgerView>(
    view: &mut V,
    params: &ChainParams,
    head: &ChainHead,
    block: &Block,
    local_now: Timestamp,
) -> ChainResult<AppliedBlock> {
    let producer = verify_header(&*view, params, head, block, local_now)?;
    let header = &block.header;
    let block_num = header.block_num;

    let mut state = PendingState::with_now(&mut *view, header.timestamp);
    update_production_info(&mut state, params, head, header, producer)?;

    for (index, trx) in block.transactions.iter().enumerate() {
        evaluate_transaction(&mut state, params, block_num, trx, index as u32).map_err(
            |source| ChainError::Transaction {
                block_num,
                index,
                source,
            },
        )?;
    }

    let fills = execute_dirty_markets(&mut state, params, block_num);
    pay_delegate(&mut state, params, block_num, producer);

    let seed = next_random_seed(&header.previous_secret, &state.random_seed());
    state.set_random_seed(seed);
    if block_num % params.num_delegates.max(1) == 0 {
        let mut next = top_delegates(&state, params.num_delegates as usize);
        shuffle_delegates(&mut next, &seed);
        debug!(%block_num, ?next, "new delegate round");
        state.set_active_delegates(next);
    }

    let undo = state.get_undo_state();
    let delta = state.into_delta();
    trace!(
        %block_num,
        txs = block.transactions.len(),
        fills = fills.len(),
        writes = delta.len(),
        "applied block"
    );
    Ok(AppliedBlock { delta, undo })
}

/// Checks the producer's revealed secret, records the slots missed since
/// the head and adjusts the confirmation requirement.
fn update_production_info<V: LedgerView>(
    state: &mut V,
    params: &ChainParams,
    head: &ChainHead,
    header: &BlockHeader,
    producer: AccountId,
) -> Result<(), HeaderError> {
    let interval = params.block_interval_sec;
    let active = state.active_delegates();
    let mut confirmations = i64::from(state.confirmation_requirement());

    // no slots are owed before the first block
    if head.block_num > 0 {
        let mut slot = head.timestamp.saturating_add_secs(interval);
        while slot < header.timestamp {
            if let Some(missed) = signing_delegate_id(&active, slot, interval) {
                if let Some(mut rec) = state.get_account(missed) {
                    if let Some(d) = rec.delegate_info.as_mut() {
                        d.blocks_missed += 1;
                    }
                    state.store_account(rec);
                }
            }
            confirmations += 2;
            slot = slot.saturating_add_secs(interval);
        }
    }

    let max = i64::from(3 * params.num_delegates.max(1));
    let required = (confirmations - 1).clamp(1, max) as u32;
    state.set_property(
        PropertyId::ConfirmationRequirement,
        PropertyValue::Count(required),
    );

    let mut rec = state
        .get_account(producer)
        .ok_or(HeaderError::NoSigningKey(producer))?;
    let stats = rec
        .delegate_info
        .as_mut()
        .ok_or(HeaderError::NoSigningKey(producer))?;
    if stats.blocks_produced > 0
        && stats.next_secret_hash != Some(ripemd160(header.previous_secret.as_slice()))
    {
        return Err(HeaderError::InvalidSecret(producer));
    }
    stats.blocks_produced += 1;
    stats.next_secret_hash = Some(header.next_secret_hash);
    stats.last_block_num_produced = header.block_num;
    state.store_account(rec);
    Ok(())
}

/// Pays the producer its share of the block reward.  The rest is burned,
/// which here means never issued.
fn pay_delegate<V: LedgerView>(
    state: &mut V,
    params: &ChainParams,
    block_num: u32,
    producer: AccountId,
) {
    let reward = params.block_reward(block_num);
    let Some(mut rec) = state.get_account(producer) else {
        return;
    };
    let Some(d) = rec.delegate_info.as_mut() else {
        return;
    };

    let paid = reward * Amount::from(d.pay_rate) / 100;
    let burned = reward - paid;
    d.pay_balance += paid;
    d.votes_for += paid;
    d.total_paid += paid;
    d.total_burned += burned;
    state.store_account(rec);

    if let Some(mut base) = state.get_asset(AssetId::BASE) {
        base.current_share_supply += paid;
        state.store_asset(base);
    }
}

#[cfg(test)]
mod tests {
    use dexchain_ledger::ChainStore;
    use dexchain_primitives::buf::{Buf20, Buf32};
    use dexchain_test_utils::{genesis::test_genesis, keys::secret};

    use super::*;
    use crate::genesis::init_genesis_store;

    fn setup() -> (ChainStore, ChainParams, ChainHead) {
        let params = ChainParams {
            num_delegates: 3,
            ..Default::default()
        };
        let store = init_genesis_store(&test_genesis(3), &params).unwrap();
        let head = ChainHead::genesis(store.now());
        (store, params, head)
    }

    /// Block signed by whoever is scheduled at `slot` slots past genesis.
    fn block_at(store: &ChainStore, params: &ChainParams, head: &ChainHead, slot: u32) -> Block {
        let ts = head
            .timestamp
            .saturating_add_secs(slot * params.block_interval_sec);
        let producer =
            signing_delegate_id(&store.active_delegates(), ts, params.block_interval_sec).unwrap();
        let mut header = BlockHeader::new(
            head.id,
            head.block_num + 1,
            ts,
            Block::compute_transaction_digest(&[]),
            Buf20::zero(),
            Buf20::new([1; 20]),
        );
        header.sign(&secret(producer.inner() as u8));
        Block::new(header, vec![])
    }

    #[test]
    fn test_apply_leaves_view_untouched() {
        let (mut store, params, head) = setup();
        let before = store.clone();
        let block = block_at(&store, &params, &head, 1);

        let applied = apply_block(&mut store, &params, &head, &block, block.timestamp()).unwrap();
        assert!(store.same_ledger(&before));

        applied.delta.apply_to(&mut store);
        let producer = signing_delegate_id(
            &before.active_delegates(),
            block.timestamp(),
            params.block_interval_sec,
        )
        .unwrap();
        let stats = store.get_account(producer).unwrap().delegate_info.unwrap();
        assert_eq!(stats.blocks_produced, 1);
        assert_eq!(stats.pay_balance, params.block_reward(1));
        assert_ne!(store.random_seed(), Buf32::zero());

        applied.undo.apply_to(&mut store);
        assert!(store.same_ledger(&before));
    }

    #[test]
    fn test_header_rejections() {
        let (mut store, params, head) = setup();
        let good = block_at(&store, &params, &head, 1);
        let now = good.timestamp();

        let mut wrong_num = good.clone();
        wrong_num.header.block_num = 5;
        assert!(matches!(
            verify_header(&store, &params, &head, &wrong_num, now),
            Err(HeaderError::NotSequential { got: 5, head: 0 })
        ));

        let mut unaligned = good.clone();
        unaligned.header.timestamp = now.saturating_add_secs(1);
        assert_eq!(
            verify_header(&store, &params, &head, &unaligned, now),
            Err(HeaderError::UnalignedTimestamp(unaligned.timestamp()))
        );

        let far = block_at(&store, &params, &head, 10);
        assert!(matches!(
            verify_header(&store, &params, &head, &far, now),
            Err(HeaderError::TimeInFuture { .. })
        ));

        let mut bad_digest = good.clone();
        bad_digest.header.transaction_digest = Buf32::new([3; 32]);
        assert!(matches!(
            apply_block(&mut store, &params, &head, &bad_digest, now),
            Err(ChainError::Header(HeaderError::InvalidDigest))
        ));

        // the id changes with the header, so re-sign with a delegate that
        // does not own the slot
        let mut wrong_signer = good.clone();
        let producer = verify_header(&store, &params, &head, &good, now).unwrap();
        let other = producer.inner() % 3 + 1;
        wrong_signer.header.sign(&secret(other as u8));
        assert_eq!(
            verify_header(&store, &params, &head, &wrong_signer, now),
            Err(HeaderError::WrongSigner(producer))
        );
    }

    #[test]
    fn test_missed_slots_counted() {
        let (mut store, params, head) = setup();
        let first = block_at(&store, &params, &head, 1);
        let applied = apply_block(&mut store, &params, &head, &first, first.timestamp()).unwrap();
        applied.delta.apply_to(&mut store);
        let head = ChainHead::of(&first.header);

        // skip one slot
        let second = block_at(&store, &params, &head, 2);
        let skipped = head.timestamp.saturating_add_secs(params.block_interval_sec);
        let missed = signing_delegate_id(
            &store.active_delegates(),
            skipped,
            params.block_interval_sec,
        )
        .unwrap();
        let applied = apply_block(&mut store, &params, &head, &second, second.timestamp()).unwrap();
        applied.delta.apply_to(&mut store);

        let stats = store.get_account(missed).unwrap().delegate_info.unwrap();
        assert_eq!(stats.blocks_missed, 1);
        assert_eq!(store.confirmation_requirement(), 2);
    }
}
