use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    amount::Amount,
    buf::Buf32,
    errors::CryptoError,
    hash::sha256_parts,
    ids::{AssetId, SlateId},
    keys::{CompactSignature, PublicKey},
    time::Timestamp,
    SecretKey,
};
use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// Transaction id, the chain-salted digest of the unsigned transaction.
pub type TxId = Buf32;

/// Only accepted wire version.
pub const TRANSACTION_VERSION: u8 = 1;

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct Transaction {
    pub version: u8,
    pub expiration: Timestamp,
    /// Slate applied to deposits that do not name their own.
    pub delegate_slate_id: SlateId,
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn new(expiration: Timestamp) -> Self {
        Self {
            version: TRANSACTION_VERSION,
            expiration,
            delegate_slate_id: SlateId::NONE,
            operations: Vec::new(),
        }
    }

    pub fn with_op(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Signing digest and id.  Salting with the chain id keeps a transaction
    /// from being replayed on another chain.
    pub fn digest(&self, chain_id: &Buf32) -> TxId {
        // encoding into a Vec cannot fail
        let buf = borsh::to_vec(self).unwrap_or_default();
        sha256_parts(&[buf.as_slice(), chain_id.as_slice()])
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct SignedTransaction {
    pub trx: Transaction,
    pub signatures: Vec<CompactSignature>,
}

impl SignedTransaction {
    pub fn new(trx: Transaction) -> Self {
        Self {
            trx,
            signatures: Vec::new(),
        }
    }

    pub fn id(&self, chain_id: &Buf32) -> TxId {
        self.trx.digest(chain_id)
    }

    pub fn sign(&mut self, sk: &SecretKey, chain_id: &Buf32) {
        let digest = self.trx.digest(chain_id);
        self.signatures.push(CompactSignature::sign(&digest, sk));
    }

    /// Keys that signed the transaction.
    pub fn signees(&self, chain_id: &Buf32) -> Result<Vec<PublicKey>, CryptoError> {
        let digest = self.trx.digest(chain_id);
        self.signatures.iter().map(|s| s.recover(&digest)).collect()
    }

    /// Serialized size in bytes, used for fee calculation.
    pub fn data_size(&self) -> usize {
        borsh::object_length(self).unwrap_or(0)
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    BorshDeserialize,
    BorshSerialize,
    Deserialize,
    Serialize,
)]
pub struct TransactionLocation {
    pub block_num: u32,
    pub trx_num: u32,
}

/// Applied transaction with its position in the chain.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct TransactionRecord {
    pub id: TxId,
    pub location: TransactionLocation,
    pub trx: SignedTransaction,
    pub fees_paid: BTreeMap<AssetId, Amount>,
}

#[cfg(test)]
mod tests {
    use dexchain_primitives::{address::Address, buf::Buf20, keys::secret_key_from_bytes};

    use super::*;
    use crate::balance::WithdrawCondition;

    fn sample_trx() -> Transaction {
        let cond = WithdrawCondition::signature(Address::new(Buf20::zero()), AssetId::BASE);
        Transaction::new(Timestamp::from_secs(1000)).with_op(Operation::deposit(10, cond))
    }

    #[test]
    fn test_digest_is_chain_salted() {
        let trx = sample_trx();
        let a = trx.digest(&Buf32::new([1; 32]));
        let b = trx.digest(&Buf32::new([2; 32]));
        assert_ne!(a, b);
        assert_eq!(a, trx.digest(&Buf32::new([1; 32])));
    }

    #[test]
    fn test_sign_and_recover() {
        let chain_id = Buf32::new([7; 32]);
        let sk = secret_key_from_bytes(&[3; 32]).expect("secret key");
        let mut signed = SignedTransaction::new(sample_trx());
        signed.sign(&sk, &chain_id);

        let signees = signed.signees(&chain_id).expect("recover");
        assert_eq!(signees, vec![PublicKey::from_secret(&sk)]);

        // signature does not carry over to another chain
        let other = signed.signees(&Buf32::new([8; 32])).unwrap_or_default();
        assert_ne!(other, signees);
    }

    #[test]
    fn test_data_size_grows_with_ops() {
        let one = SignedTransaction::new(sample_trx());
        let mut two = one.clone();
        two.trx.push(two.trx.operations[0].clone());
        assert!(two.data_size() > one.data_size());
    }
}
