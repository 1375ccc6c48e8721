//! Delegate scheduling: which delegate signs a slot, how the active list is
//! picked and shuffled each round, and how the random seed evolves.

use dexchain_ledger::LedgerView;
use dexchain_primitives::{
    buf::{Buf20, Buf32},
    hash::sha256_parts,
    ids::AccountId,
    time::Timestamp,
};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Delegate scheduled to sign the slot at `timestamp`.
pub fn signing_delegate_id(
    active: &[AccountId],
    timestamp: Timestamp,
    block_interval_sec: u32,
) -> Option<AccountId> {
    if active.is_empty() || block_interval_sec == 0 {
        return None;
    }
    let slot = (timestamp.secs() / block_interval_sec) as usize;
    Some(active[slot % active.len()])
}

/// The `count` delegates with the most net votes, ties going to the older
/// account.  Retracted delegates never make the list.
pub fn top_delegates<V: LedgerView + ?Sized>(view: &V, count: usize) -> Vec<AccountId> {
    let mut delegates = view.delegate_accounts();
    delegates.retain(|d| !d.is_retracted());
    delegates.sort_by(|a, b| b.net_votes().cmp(&a.net_votes()).then(a.id.cmp(&b.id)));
    delegates.into_iter().take(count).map(|d| d.id).collect()
}

/// Fisher-Yates shuffle drawing from a ChaCha stream keyed by `seed`, so
/// every node derives the same order.
pub fn shuffle_delegates(delegates: &mut [AccountId], seed: &Buf32) {
    let mut rng = ChaCha20Rng::from_seed(*seed.as_bytes());
    for i in (1..delegates.len()).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        delegates.swap(i, j);
    }
}

/// Mixes a revealed delegate secret into the chain's random seed.
pub fn next_random_seed(revealed: &Buf20, current: &Buf32) -> Buf32 {
    sha256_parts(&[revealed.as_slice(), current.as_slice()])
}
