use borsh::{BorshDeserialize, BorshSerialize};
use dexchain_primitives::{
    buf::{Buf20, Buf32, Buf65},
    errors::CryptoError,
    hash::sha256,
    keys::{CompactSignature, PublicKey},
    time::Timestamp,
    SecretKey,
};
use serde::{Deserialize, Serialize};

use crate::transaction::SignedTransaction;

pub type BlockId = Buf32;

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub block_num: u32,
    pub timestamp: Timestamp,
    pub transaction_digest: Buf32,
    /// Secret committed to by the producer's previous block.
    pub previous_secret: Buf20,
    /// ripemd160 of the secret the producer reveals next time.
    pub next_secret_hash: Buf20,
    pub delegate_signature: CompactSignature,
}

/// Header fields covered by the block id and the producer's signature.
#[derive(BorshSerialize)]
struct UnsignedHeader<'a> {
    previous: &'a BlockId,
    block_num: u32,
    timestamp: Timestamp,
    transaction_digest: &'a Buf32,
    previous_secret: &'a Buf20,
    next_secret_hash: &'a Buf20,
}

impl BlockHeader {
    pub fn new(
        previous: BlockId,
        block_num: u32,
        timestamp: Timestamp,
        transaction_digest: Buf32,
        previous_secret: Buf20,
        next_secret_hash: Buf20,
    ) -> Self {
        Self {
            previous,
            block_num,
            timestamp,
            transaction_digest,
            previous_secret,
            next_secret_hash,
            delegate_signature: CompactSignature::new(Buf65::zero()),
        }
    }

    pub fn id(&self) -> BlockId {
        let unsigned = UnsignedHeader {
            previous: &self.previous,
            block_num: self.block_num,
            timestamp: self.timestamp,
            transaction_digest: &self.transaction_digest,
            previous_secret: &self.previous_secret,
            next_secret_hash: &self.next_secret_hash,
        };
        // encoding into a Vec cannot fail
        let buf = borsh::to_vec(&unsigned).unwrap_or_default();
        sha256(&buf)
    }

    pub fn sign(&mut self, sk: &SecretKey) {
        self.delegate_signature = CompactSignature::sign(&self.id(), sk);
    }

    pub fn signee(&self) -> Result<PublicKey, CryptoError> {
        self.delegate_signature.recover(&self.id())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize, Deserialize, Serialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<SignedTransaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn id(&self) -> BlockId {
        self.header.id()
    }

    pub fn block_num(&self) -> u32 {
        self.header.block_num
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp
    }

    pub fn compute_transaction_digest(transactions: &[SignedTransaction]) -> Buf32 {
        let buf = borsh::to_vec(transactions).unwrap_or_default();
        sha256(&buf)
    }

    pub fn has_valid_transaction_digest(&self) -> bool {
        Self::compute_transaction_digest(&self.transactions) == self.header.transaction_digest
    }
}
