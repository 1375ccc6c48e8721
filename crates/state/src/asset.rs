use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_params::constants::{MAX_SHARES, MAX_SYMBOL_SIZE, MIN_SYMBOL_SIZE};
use dexchain_primitives::{
    amount::Amount,
    ids::{AccountId, AssetId},
    time::Timestamp,
};
use serde::{Deserialize, Serialize};

/// Who controls an asset's supply.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    BorshDeserialize,
    BorshSerialize,
    Deserialize,
    Serialize,
)]
pub enum AssetIssuer {
    /// The chain's base asset, created at genesis and by delegate pay.
    Network,

    /// Supply only created by short positions and destroyed by covers.
    Market,

    /// User issued asset controlled by an account.
    Account(AccountId),
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct AssetRecord {
    pub id: AssetId,
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub issuer: AssetIssuer,
    /// Share units per whole unit, a power of ten.
    pub precision: Amount,
    pub registration_date: Timestamp,
    pub last_update: Timestamp,
    pub current_share_supply: Amount,
    pub maximum_share_supply: Amount,
    pub collected_fees: Amount,
}

impl AssetRecord {
    pub fn is_market_issued(&self) -> bool {
        self.issuer == AssetIssuer::Market
    }

    pub fn issuer_account(&self) -> Option<AccountId> {
        match self.issuer {
            AssetIssuer::Account(id) => Some(id),
            _ => None,
        }
    }

    pub fn available_shares(&self) -> Amount {
        self.maximum_share_supply - self.current_share_supply
    }

    pub fn can_issue(&self, amount: Amount) -> bool {
        amount > 0 && amount <= self.available_shares()
    }
}

/// Checks an asset symbol.  The root segment is 3 to 5 uppercase letters,
/// dotted sub-symbols add up to 5 more letters per segment.
pub fn is_valid_symbol(symbol: &str) -> bool {
    let mut segments = symbol.split('.');
    let Some(root) = segments.next() else {
        return false;
    };
    if root.len() < MIN_SYMBOL_SIZE || root.len() > MAX_SYMBOL_SIZE || !is_upper_alpha(root) {
        return false;
    }
    segments.all(|seg| !seg.is_empty() && seg.len() <= MAX_SYMBOL_SIZE && is_upper_alpha(seg))
}

fn is_upper_alpha(s: &str) -> bool {
    s.bytes().all(|c| c.is_ascii_uppercase())
}

/// Parent of a dotted symbol, `"USD"` for `"USD.X"`.
pub fn parent_symbol(symbol: &str) -> Option<&str> {
    symbol.rsplit_once('.').map(|(parent, _)| parent)
}

/// Precision must be a power of ten no larger than the share cap.
pub fn is_valid_precision(precision: Amount) -> bool {
    let mut p = 1;
    while p <= MAX_SHARES {
        if p == precision {
            return true;
        }
        p *= 10;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert!(is_valid_symbol("USD"));
        assert!(is_valid_symbol("GOLDX"));
        assert!(is_valid_symbol("USD.AB"));
        assert!(!is_valid_symbol("US"));
        assert!(!is_valid_symbol("usd"));
        assert!(!is_valid_symbol("TOOLONG"));
        assert!(!is_valid_symbol("USD."));
        assert!(!is_valid_symbol("US1"));
    }

    #[test]
    fn test_parent_symbol() {
        assert_eq!(parent_symbol("USD.AB"), Some("USD"));
        assert_eq!(parent_symbol("USD.AB.C"), Some("USD.AB"));
        assert_eq!(parent_symbol("USD"), None);
    }

    #[test]
    fn test_precision() {
        assert!(is_valid_precision(1));
        assert!(is_valid_precision(100_000));
        assert!(is_valid_precision(MAX_SHARES));
        assert!(!is_valid_precision(0));
        assert!(!is_valid_precision(30));
        assert!(!is_valid_precision(MAX_SHARES * 2));
    }
}
