use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// Share units.  Signed so that scratch balances and deltas can go negative
/// during evaluation, stored balances are always non-negative.
pub type Amount = i64;

/// An amount of a specific asset.
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
pub struct Asset {
    pub amount: Amount,
    pub asset_id: AssetId,
}

impl Asset {
    pub const fn new(amount: Amount, asset_id: AssetId) -> Self {
        Self { amount, asset_id }
    }

    pub const fn base(amount: Amount) -> Self {
        Self::new(amount, AssetId::BASE)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.amount, self.asset_id)
    }
}
