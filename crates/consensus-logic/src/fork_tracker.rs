//! Tree of every block seen, with where each one stands relative to the
//! main chain.

use std::collections::{BTreeSet, HashMap};

use dexchain_state::block::BlockId;

/// Where a known block stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    /// Stored, but some ancestor is missing.
    Received,
    /// Every ancestor is known, not applied yet.
    Linked,
    /// Applied and currently on the main chain.
    MainChain,
    /// Applied once and later popped, or linked on a shorter branch.
    ForkedOff,
    /// Failed to apply, as did every block built on it.
    Invalid,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ForkData {
    pub(crate) next_blocks: BTreeSet<BlockId>,
    /// Whether the block itself was seen, or is only referenced as a parent.
    pub(crate) is_known: bool,
    pub(crate) is_linked: bool,
    pub(crate) is_included: bool,
    /// Unset until the block is applied or fails to.
    pub(crate) is_valid: Option<bool>,
}

impl ForkData {
    pub(crate) fn can_link(&self) -> bool {
        self.is_linked && self.is_valid != Some(false)
    }

    pub(crate) fn status(&self) -> BlockStatus {
        if self.is_valid == Some(false) {
            BlockStatus::Invalid
        } else if self.is_included {
            BlockStatus::MainChain
        } else if !self.is_linked {
            BlockStatus::Received
        } else if self.is_valid == Some(true) {
            BlockStatus::ForkedOff
        } else {
            BlockStatus::Linked
        }
    }
}

#[derive(Debug)]
pub(crate) struct ForkTracker {
    forks: HashMap<BlockId, ForkData>,
}

impl ForkTracker {
    /// Tracker holding only the genesis state, under the zero id.
    pub(crate) fn new() -> Self {
        let root = ForkData {
            is_known: true,
            is_linked: true,
            is_included: true,
            is_valid: Some(true),
            ..Default::default()
        };
        Self {
            forks: HashMap::from([(BlockId::zero(), root)]),
        }
    }

    pub(crate) fn get(&self, id: &BlockId) -> Option<&ForkData> {
        self.forks.get(id).filter(|f| f.is_known)
    }

    /// Records a block under its parent, linking it and any descendants
    /// already waiting on it when the parent is linked.
    pub(crate) fn insert(&mut self, id: BlockId, previous: BlockId) -> ForkData {
        let prev = self.forks.entry(previous).or_default();
        prev.next_blocks.insert(id);
        let prev_linked = prev.is_linked;

        let cur = self.forks.entry(id).or_default();
        cur.is_known = true;
        let newly_linked = !cur.is_linked && prev_linked;
        if newly_linked {
            cur.is_linked = true;
            let next = cur.next_blocks.clone();
            self.mark_linked(next);
        }
        self.forks.get(&id).cloned().unwrap_or_default()
    }

    fn mark_linked(&mut self, mut ids: BTreeSet<BlockId>) {
        while let Some(id) = ids.pop_first() {
            if let Some(f) = self.forks.get_mut(&id) {
                f.is_linked = true;
                ids.extend(f.next_blocks.iter().copied());
            }
        }
    }

    /// Marks a block and every block built on it invalid.
    pub(crate) fn mark_invalid(&mut self, id: BlockId) {
        let mut ids = BTreeSet::from([id]);
        while let Some(id) = ids.pop_first() {
            if let Some(f) = self.forks.get_mut(&id) {
                f.is_valid = Some(false);
                ids.extend(f.next_blocks.iter().copied());
            }
        }
    }

    pub(crate) fn mark_included(&mut self, id: BlockId, included: bool) {
        let f = self.forks.entry(id).or_default();
        f.is_included = included;
        if included {
            f.is_valid = Some(true);
        }
    }

    /// Walks back from `id` to the first block on the main chain.  The
    /// result starts with `id` and ends with that main chain block.
    /// `previous_of` looks a block's parent up.
    pub(crate) fn fork_history(
        &self,
        id: BlockId,
        previous_of: impl Fn(&BlockId) -> Option<BlockId>,
    ) -> Option<Vec<BlockId>> {
        let mut history = vec![id];
        let mut cur = id;
        loop {
            let prev = previous_of(&cur)?;
            history.push(prev);
            let data = self.forks.get(&prev)?;
            if data.is_included {
                return Some(history);
            }
            if !data.can_link() {
                return None;
            }
            cur = prev;
        }
    }
}
