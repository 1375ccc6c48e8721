//! Native and legacy address encodings.
//!
//! A native [`Address`] is the hash160 of a compressed public key.  Balances
//! that were created on the legacy PTS/BTC style networks are keyed by a
//! [`PtsAddress`] instead, which is folded into the native address space by
//! hashing its full 25 byte encoding.  When recovering the signers of a
//! transaction the evaluator considers every encoding of every recovered key,
//! so old balances stay spendable.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    buf::Buf20,
    errors::CryptoError,
    hash::{hash160, sha256d},
    keys::PublicKey,
    macros::impl_buf_wrapper,
};

/// Version byte of PTS addresses.
pub const PTS_ADDRESS_VERSION: u8 = 56;

/// Version byte of BTC mainnet p2pkh addresses.
pub const BTC_ADDRESS_VERSION: u8 = 0;

#[derive(
    Clone,
    Copy,
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
pub struct Address(Buf20);

impl_buf_wrapper!(Address, Buf20);

impl Address {
    pub fn from_pubkey(pk: &PublicKey) -> Self {
        Self(hash160(pk.as_slice()))
    }
}

/// Legacy 25 byte address: version, hash160 of the key, 4 byte checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct PtsAddress([u8; 25]);

impl PtsAddress {
    /// Builds the legacy address of a key, either from its compressed or
    /// uncompressed serialization.
    pub fn from_pubkey(pk: &PublicKey, compressed: bool, version: u8) -> Result<Self, CryptoError> {
        let point = pk.to_secp()?;
        let key_hash = if compressed {
            hash160(&point.serialize())
        } else {
            hash160(&point.serialize_uncompressed())
        };

        let mut out = [0u8; 25];
        out[0] = version;
        out[1..21].copy_from_slice(key_hash.as_slice());
        let check = sha256d(&out[..21]);
        out[21..].copy_from_slice(&check.as_slice()[..4]);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 25] {
        &self.0
    }

    pub fn version(&self) -> u8 {
        self.0[0]
    }

    /// Checks the trailing checksum.
    pub fn is_valid(&self) -> bool {
        let check = sha256d(&self.0[..21]);
        check.as_slice()[..4] == self.0[21..]
    }
}

impl fmt::Debug for PtsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtsAddress({})", hex::encode(self.0))
    }
}

impl From<PtsAddress> for Address {
    fn from(value: PtsAddress) -> Self {
        Address(hash160(&value.0))
    }
}

/// Every address a key can be referred to by: the native address followed by
/// the compressed/uncompressed legacy encodings under both version bytes.
pub fn all_key_addresses(pk: &PublicKey) -> Result<Vec<Address>, CryptoError> {
    let mut out = Vec::with_capacity(5);
    out.push(pk.address());
    for version in [PTS_ADDRESS_VERSION, BTC_ADDRESS_VERSION] {
        for compressed in [false, true] {
            out.push(PtsAddress::from_pubkey(pk, compressed, version)?.into());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::secret_key_from_bytes;

    fn key() -> PublicKey {
        PublicKey::from_secret(&secret_key_from_bytes(&[9u8; 32]).unwrap())
    }

    #[test]
    fn test_pts_checksum() {
        let pts = PtsAddress::from_pubkey(&key(), true, PTS_ADDRESS_VERSION).unwrap();
        assert!(pts.is_valid());
        assert_eq!(pts.version(), PTS_ADDRESS_VERSION);

        let mut raw = *pts.as_bytes();
        raw[3] ^= 1;
        assert!(!PtsAddress(raw).is_valid());
    }

    #[test]
    fn test_all_key_addresses_distinct() {
        let addrs = all_key_addresses(&key()).unwrap();
        assert_eq!(addrs.len(), 5);
        let mut dedup = addrs.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 5);
        assert_eq!(addrs[0], key().address());
    }

    #[test]
    fn test_null_key_has_no_legacy_address() {
        assert!(PtsAddress::from_pubkey(&PublicKey::NULL, true, 0).is_err());
    }
}
