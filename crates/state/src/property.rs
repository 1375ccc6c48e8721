//! Chain-wide scalar properties.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    amount::Amount,
    buf::Buf32,
    ids::{AccountId, AssetId},
};
use serde::{Deserialize, Serialize};

use crate::market::MarketPair;

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshDeserialize,
    BorshSerialize,
    Deserialize,
    Serialize,
)]
pub enum PropertyId {
    ChainId,
    LastAccountId,
    LastAssetId,
    ActiveDelegates,
    LastRandomSeed,
    DirtyMarkets,
    /// Minimum fee per kilobyte of transaction.
    FeeRate,
    ConfirmationRequirement,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub enum PropertyValue {
    Hash(Buf32),
    AccountId(AccountId),
    AssetId(AssetId),
    Delegates(Vec<AccountId>),
    Markets(BTreeSet<MarketPair>),
    Amount(Amount),
    Count(u32),
}

impl PropertyValue {
    pub fn as_hash(&self) -> Option<Buf32> {
        match self {
            Self::Hash(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_account_id(&self) -> Option<AccountId> {
        match self {
            Self::AccountId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_asset_id(&self) -> Option<AssetId> {
        match self {
            Self::AssetId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_delegates(&self) -> Option<&[AccountId]> {
        match self {
            Self::Delegates(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_markets(&self) -> Option<&BTreeSet<MarketPair>> {
        match self {
            Self::Markets(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<Amount> {
        match self {
            Self::Amount(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Count(c) => Some(*c),
            _ => None,
        }
    }
}
