use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    address::Address, amount::Amount, buf::Buf32, hash::sha256, keys::PublicKey,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_SHARES, PRECISION};

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("genesis has no delegates")]
    NoDelegates,

    #[error("duplicate genesis account name '{0}'")]
    DuplicateName(String),

    #[error("genesis delegate '{0}' has pay rate above 100")]
    InvalidPayRate(String),

    #[error("genesis balance for {0} is not positive")]
    NonPositiveBalance(Address),

    #[error("genesis balances exceed the maximum share supply")]
    SupplyOverflow,

    #[error("genesis timestamp {0} is not aligned to the block interval")]
    UnalignedTimestamp(Timestamp),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Asset created at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisAsset {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_precision")]
    pub precision: Amount,
}

fn default_precision() -> Amount {
    PRECISION
}

/// Delegate account registered at genesis.  The owner key doubles as the
/// active key and the initial block signing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisDelegate {
    pub name: String,
    pub owner: PublicKey,
    #[serde(default = "default_pay_rate")]
    pub pay_rate: u8,
}

fn default_pay_rate() -> u8 {
    100
}

/// Initial base asset balance, claimable by a signature from `owner`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisBalance {
    pub owner: Address,
    pub amount: Amount,
}

/// Full description of the genesis state.  Hashing its borsh encoding yields
/// the chain id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisConfig {
    pub timestamp: Timestamp,
    pub base_asset: GenesisAsset,
    pub delegates: Vec<GenesisDelegate>,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    /// Market-issued assets, supply created only by shorts.
    #[serde(default)]
    pub market_assets: Vec<GenesisAsset>,
}

impl GenesisConfig {
    /// Deserializes from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn chain_id(&self) -> Buf32 {
        // encoding into a Vec cannot fail
        let buf = borsh::to_vec(self).unwrap_or_default();
        sha256(&buf)
    }

    pub fn total_balances(&self) -> Option<Amount> {
        self.balances
            .iter()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(b.amount))
    }

    /// Structural checks that do not depend on ledger rules.
    pub fn validate(&self, block_interval_sec: u32) -> Result<(), GenesisError> {
        if self.delegates.is_empty() {
            return Err(GenesisError::NoDelegates);
        }
        if !self.timestamp.is_aligned(block_interval_sec) {
            return Err(GenesisError::UnalignedTimestamp(self.timestamp));
        }

        let mut names = BTreeSet::new();
        for d in &self.delegates {
            if !names.insert(d.name.as_str()) {
                return Err(GenesisError::DuplicateName(d.name.clone()));
            }
            if d.pay_rate > 100 {
                return Err(GenesisError::InvalidPayRate(d.name.clone()));
            }
        }

        for b in &self.balances {
            if b.amount <= 0 {
                return Err(GenesisError::NonPositiveBalance(b.owner));
            }
        }
        match self.total_balances() {
            Some(total) if total <= MAX_SHARES => Ok(()),
            _ => Err(GenesisError::SupplyOverflow),
        }
    }
}
