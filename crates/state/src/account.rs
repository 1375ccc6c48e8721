//! Account and delegate records.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_params::constants::{MAX_NAME_SIZE, MIN_NAME_SIZE};
use dexchain_primitives::{
    address::Address, amount::Amount, buf::Buf20, ids::AccountId, keys::PublicKey,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// Extra state carried by accounts registered as delegates.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize,
)]
pub struct DelegateStats {
    /// Percentage of the block reward the delegate keeps, 0 to 100.  Can
    /// only ever go down.
    pub pay_rate: u8,
    pub votes_for: Amount,
    pub pay_balance: Amount,
    /// Block signing keys keyed by the first block they are valid for.
    pub signing_key_history: BTreeMap<u32, PublicKey>,
    pub blocks_produced: u32,
    pub blocks_missed: u32,
    pub total_paid: Amount,
    pub total_burned: Amount,
    /// ripemd160 of the secret the delegate reveals in its next block.
    pub next_secret_hash: Option<Buf20>,
    pub last_block_num_produced: u32,
}

impl DelegateStats {
    pub fn new(pay_rate: u8, signing_key: PublicKey, first_block: u32) -> Self {
        let mut signing_key_history = BTreeMap::new();
        signing_key_history.insert(first_block, signing_key);
        Self {
            pay_rate,
            signing_key_history,
            ..Default::default()
        }
    }

    /// Signing key in effect for `block_num`.
    pub fn signing_key_at(&self, block_num: u32) -> Option<PublicKey> {
        self.signing_key_history
            .range(..=block_num)
            .next_back()
            .map(|(_, k)| *k)
    }

    pub fn current_signing_key(&self) -> Option<PublicKey> {
        self.signing_key_history.values().next_back().copied()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    pub public_data: Option<String>,
    pub owner_key: PublicKey,
    /// Active keys keyed by the time they were set.  The latest one wins.
    pub active_key_history: BTreeMap<Timestamp, PublicKey>,
    pub registration_date: Timestamp,
    pub last_update: Timestamp,
    pub delegate_info: Option<DelegateStats>,
}

impl AccountRecord {
    pub fn new(
        id: AccountId,
        name: String,
        owner_key: PublicKey,
        active_key: PublicKey,
        now: Timestamp,
    ) -> Self {
        let mut active_key_history = BTreeMap::new();
        active_key_history.insert(now, active_key);
        Self {
            id,
            name,
            public_data: None,
            owner_key,
            active_key_history,
            registration_date: now,
            last_update: now,
            delegate_info: None,
        }
    }

    pub fn active_key(&self) -> PublicKey {
        self.active_key_history
            .values()
            .next_back()
            .copied()
            .unwrap_or(PublicKey::NULL)
    }

    pub fn set_active_key(&mut self, now: Timestamp, key: PublicKey) {
        self.active_key_history.insert(now, key);
    }

    pub fn owner_address(&self) -> Address {
        self.owner_key.address()
    }

    pub fn active_address(&self) -> Address {
        self.active_key().address()
    }

    /// A retracted account has the null active key and can never sign again.
    pub fn is_retracted(&self) -> bool {
        self.active_key().is_null()
    }

    pub fn is_delegate(&self) -> bool {
        self.delegate_info.is_some()
    }

    pub fn delegate_pay_rate(&self) -> Option<u8> {
        self.delegate_info.as_ref().map(|d| d.pay_rate)
    }

    pub fn net_votes(&self) -> Amount {
        self.delegate_info.as_ref().map_or(0, |d| d.votes_for)
    }

    pub fn signing_key_at(&self, block_num: u32) -> Option<PublicKey> {
        self.delegate_info
            .as_ref()
            .and_then(|d| d.signing_key_at(block_num))
    }
}

/// Checks an account name: lowercase dot separated segments of letters,
/// digits and dashes, each starting with a letter and not ending in a dash.
pub fn is_valid_account_name(name: &str) -> bool {
    if name.len() < MIN_NAME_SIZE || name.len() > MAX_NAME_SIZE {
        return false;
    }
    name.split('.').all(is_valid_name_segment)
}

fn is_valid_name_segment(seg: &str) -> bool {
    let bytes = seg.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if !first.is_ascii_lowercase() || *last == b'-' {
        return false;
    }
    bytes
        .iter()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
}

/// Name of the parent account, `"bob"` for `"alice.bob"`.
pub fn parent_account_name(name: &str) -> Option<&str> {
    name.split_once('.').map(|(_, parent)| parent)
}
