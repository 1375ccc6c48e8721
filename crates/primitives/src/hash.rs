//! Hashing helpers.  Everything consensus-relevant goes through these so the
//! exact hash functions stay in one place.

use bitcoin::hashes::{
    hash160 as btc_hash160, ripemd160 as btc_ripemd160, sha256d as btc_sha256d, Hash,
};
use sha2::{Digest, Sha256};

use crate::buf::{Buf20, Buf32};

/// Direct untagged sha256 of some data.
pub fn sha256(data: &[u8]) -> Buf32 {
    Buf32::new(Sha256::digest(data).into())
}

/// Sha256 over the concatenation of several parts, without allocating.
pub fn sha256_parts(parts: &[&[u8]]) -> Buf32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Buf32::new(hasher.finalize().into())
}

/// Double sha256, used for legacy address checksums.
pub fn sha256d(data: &[u8]) -> Buf32 {
    Buf32::new(btc_sha256d::Hash::hash(data).to_byte_array())
}

/// ripemd160(sha256(data)).
pub fn hash160(data: &[u8]) -> Buf20 {
    Buf20::new(btc_hash160::Hash::hash(data).to_byte_array())
}

/// Plain ripemd160, used for password and secret commitments.
pub fn ripemd160(data: &[u8]) -> Buf20 {
    Buf20::new(btc_ripemd160::Hash::hash(data).to_byte_array())
}
