use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    hash::sha256,
    ids::{AccountId, SlateId},
};
use serde::{Deserialize, Serialize};

/// Set of delegates a vote-linked balance votes for.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct SlateRecord {
    pub id: SlateId,
    /// Sorted and free of duplicates.
    pub delegates: Vec<AccountId>,
}

impl SlateRecord {
    pub fn new(mut delegates: Vec<AccountId>) -> Self {
        delegates.sort_unstable();
        delegates.dedup();
        let id = slate_id_of(&delegates);
        Self { id, delegates }
    }
}

/// First 8 bytes of the hash of a normalized delegate list.  The empty list
/// maps to [`SlateId::NONE`].
pub fn slate_id_of(sorted: &[AccountId]) -> SlateId {
    if sorted.is_empty() {
        return SlateId::NONE;
    }
    let raw: Vec<u8> = sorted.iter().flat_map(|id| id.inner().to_le_bytes()).collect();
    let h = sha256(&raw);
    let mut head = [0u8; 8];
    head.copy_from_slice(&h.as_slice()[..8]);
    SlateId::new(u64::from_le_bytes(head))
}
