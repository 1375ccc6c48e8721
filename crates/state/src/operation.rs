//! Operations carried by transactions.

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    amount::{Amount, Asset},
    ids::{AccountId, AssetId},
    keys::PublicKey,
    price::Price,
};
use serde::{Deserialize, Serialize};

use crate::{
    asset::AssetIssuer,
    balance::{BalanceId, WithdrawCondition},
    market::MarketIndexKey,
};

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub enum Operation {
    RegisterAccount {
        name: String,
        public_data: Option<String>,
        owner_key: PublicKey,
        active_key: PublicKey,
        /// `Some` registers the account as a delegate.
        delegate_pay_rate: Option<u8>,
    },

    UpdateAccount {
        account_id: AccountId,
        public_data: Option<String>,
        active_key: Option<PublicKey>,
        delegate_pay_rate: Option<u8>,
    },

    WithdrawPay {
        account_id: AccountId,
        amount: Amount,
    },

    UpdateSigningKey {
        account_id: AccountId,
        signing_key: PublicKey,
    },

    CreateAsset {
        symbol: String,
        name: String,
        description: String,
        issuer: AssetIssuer,
        maximum_share_supply: Amount,
        precision: Amount,
    },

    UpdateAsset {
        asset_id: AssetId,
        name: Option<String>,
        description: Option<String>,
        maximum_share_supply: Option<Amount>,
        precision: Option<Amount>,
    },

    IssueAsset {
        amount: Asset,
    },

    Burn {
        amount: Asset,
        account_id: Option<AccountId>,
        message: String,
    },

    Deposit {
        amount: Amount,
        condition: WithdrawCondition,
    },

    Withdraw {
        balance_id: BalanceId,
        amount: Amount,
        /// Password preimage for password-locked balances, empty otherwise.
        claim_input: Vec<u8>,
    },

    DefineSlate {
        delegates: Vec<AccountId>,
    },

    /// Positive amounts add quote to the bid, negative amounts cancel.
    Bid {
        amount: Amount,
        index: MarketIndexKey,
    },

    /// Positive amounts add base to the ask, negative amounts cancel.
    Ask {
        amount: Amount,
        index: MarketIndexKey,
    },

    /// Positive amounts add base collateral to the short, negative amounts
    /// cancel.
    Short {
        amount: Amount,
        index: MarketIndexKey,
        interest_apr_bps: u32,
        limit_price: Option<Price>,
    },

    /// Pays quote toward the position keyed by `cover_index`.
    Cover {
        amount: Amount,
        cover_index: MarketIndexKey,
    },

    AddCollateral {
        amount: Amount,
        cover_index: MarketIndexKey,
    },

    UpdateFeed {
        delegate_id: AccountId,
        quote_id: AssetId,
        price: Price,
    },
}

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
pub enum OperationKind {
    RegisterAccount,
    UpdateAccount,
    WithdrawPay,
    UpdateSigningKey,
    CreateAsset,
    UpdateAsset,
    IssueAsset,
    Burn,
    Deposit,
    Withdraw,
    DefineSlate,
    Bid,
    Ask,
    Short,
    Cover,
    AddCollateral,
    UpdateFeed,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::RegisterAccount { .. } => OperationKind::RegisterAccount,
            Self::UpdateAccount { .. } => OperationKind::UpdateAccount,
            Self::WithdrawPay { .. } => OperationKind::WithdrawPay,
            Self::UpdateSigningKey { .. } => OperationKind::UpdateSigningKey,
            Self::CreateAsset { .. } => OperationKind::CreateAsset,
            Self::UpdateAsset { .. } => OperationKind::UpdateAsset,
            Self::IssueAsset { .. } => OperationKind::IssueAsset,
            Self::Burn { .. } => OperationKind::Burn,
            Self::Deposit { .. } => OperationKind::Deposit,
            Self::Withdraw { .. } => OperationKind::Withdraw,
            Self::DefineSlate { .. } => OperationKind::DefineSlate,
            Self::Bid { .. } => OperationKind::Bid,
            Self::Ask { .. } => OperationKind::Ask,
            Self::Short { .. } => OperationKind::Short,
            Self::Cover { .. } => OperationKind::Cover,
            Self::AddCollateral { .. } => OperationKind::AddCollateral,
            Self::UpdateFeed { .. } => OperationKind::UpdateFeed,
        }
    }

    pub fn deposit(amount: Amount, condition: WithdrawCondition) -> Self {
        Self::Deposit { amount, condition }
    }

    pub fn withdraw(balance_id: BalanceId, amount: Amount) -> Self {
        Self::Withdraw {
            balance_id,
            amount,
            claim_input: Vec::new(),
        }
    }
}
