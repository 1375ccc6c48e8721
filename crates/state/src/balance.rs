//! Balances and the withdraw conditions that guard them.

use std::{collections::BTreeSet, fmt};

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    address::Address,
    amount::Amount,
    buf::{Buf20, Buf32},
    hash::sha256,
    ids::{AssetId, SlateId},
    price::Price,
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// Identifies a balance.  It is the hash of the balance's withdraw condition
/// so equal conditions always land in the same record.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
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
#[serde(transparent)]
pub struct BalanceId(Buf32);

impl BalanceId {
    pub const fn new(buf: Buf32) -> Self {
        Self(buf)
    }

    pub fn inner(&self) -> &Buf32 {
        &self.0
    }
}

impl fmt::Display for BalanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Spending predicate of a balance.
#[derive(
    Clone, Debug, Eq, PartialEq, Hash, BorshDeserialize, BorshSerialize, Deserialize, Serialize,
)]
pub enum WithdrawKind {
    /// Spendable with a signature from `owner`.
    Signature { owner: Address },

    /// Spendable with signatures from at least `required` of `owners`.
    MultiSig {
        required: u32,
        owners: BTreeSet<Address>,
    },

    /// Before `timeout` the payee may claim by revealing the preimage of
    /// `password_hash` (ripemd160).  After it the payor may reclaim.
    Password {
        payor: Address,
        payee: Address,
        timeout: Timestamp,
        password_hash: Buf20,
    },

    /// Before `date` the optionee may claim by paying the optionor at
    /// `strike_price`.  After it the optionor may reclaim.
    Option {
        optionor: Address,
        optionee: Address,
        date: Timestamp,
        strike_price: Price,
    },
}

#[derive(
    Clone, Debug, Eq, PartialEq, Hash, BorshDeserialize, BorshSerialize, Deserialize, Serialize,
)]
pub struct WithdrawCondition {
    pub asset_id: AssetId,
    /// Base asset balances with a slate count toward those delegates' votes.
    pub slate_id: SlateId,
    pub kind: WithdrawKind,
}

impl WithdrawCondition {
    pub fn new(asset_id: AssetId, slate_id: SlateId, kind: WithdrawKind) -> Self {
        Self {
            asset_id,
            slate_id,
            kind,
        }
    }

    pub fn signature(owner: Address, asset_id: AssetId) -> Self {
        Self::new(asset_id, SlateId::NONE, WithdrawKind::Signature { owner })
    }

    pub fn with_slate(mut self, slate_id: SlateId) -> Self {
        self.slate_id = slate_id;
        self
    }

    pub fn balance_id(&self) -> BalanceId {
        // encoding into a Vec cannot fail
        let buf = borsh::to_vec(self).unwrap_or_default();
        BalanceId(sha256(&buf))
    }

    /// Single owner of a signature condition.
    pub fn owner(&self) -> Option<Address> {
        match &self.kind {
            WithdrawKind::Signature { owner } => Some(*owner),
            _ => None,
        }
    }

    /// Balances whose base asset counts toward delegate votes.
    pub fn is_voting(&self) -> bool {
        self.asset_id.is_base() && !self.slate_id.is_none()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct BalanceRecord {
    pub condition: WithdrawCondition,
    pub balance: Amount,
    /// Amount weighted average time the funds were deposited.
    pub deposit_date: Timestamp,
    pub last_update: Timestamp,
}

impl BalanceRecord {
    /// Empty balance.  Stored, it acts as a tombstone and removes the record.
    pub fn empty(condition: WithdrawCondition) -> Self {
        Self {
            condition,
            balance: 0,
            deposit_date: Timestamp::ZERO,
            last_update: Timestamp::ZERO,
        }
    }

    pub fn id(&self) -> BalanceId {
        self.condition.balance_id()
    }

    pub fn asset_id(&self) -> AssetId {
        self.condition.asset_id
    }

    pub fn slate_id(&self) -> SlateId {
        self.condition.slate_id
    }

    pub fn is_empty(&self) -> bool {
        self.balance == 0
    }

    pub fn deposit(&mut self, amount: Amount, now: Timestamp) {
        let old = self.balance.max(0) as i128;
        let new = amount.max(0) as i128;
        let total = old + new;
        if total > 0 {
            let weighted =
                (old * self.deposit_date.secs() as i128 + new * now.secs() as i128) / total;
            self.deposit_date = Timestamp::from_secs(weighted as u32);
        }
        self.balance += amount;
        self.last_update = now;
    }

    pub fn withdraw(&mut self, amount: Amount, now: Timestamp) {
        self.balance -= amount;
        self.last_update = now;
    }
}
