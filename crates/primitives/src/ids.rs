//! Numeric identifiers of ledger entities.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::macros::impl_numeric_id;

/// Account id, assigned sequentially from 1 at registration.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(u32);

impl_numeric_id!(AccountId, u32);

/// Asset id.  Id 0 is the chain's base asset.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct AssetId(u32);

impl_numeric_id!(AssetId, u32);

impl AssetId {
    pub const BASE: AssetId = AssetId(0);

    pub fn is_base(&self) -> bool {
        *self == Self::BASE
    }
}

/// Delegate slate id.  Zero means "no slate", the balance votes for nobody.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SlateId(u64);

impl_numeric_id!(SlateId, u64);

impl SlateId {
    pub const NONE: SlateId = SlateId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}
