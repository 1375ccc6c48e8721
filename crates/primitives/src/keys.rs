//! Public keys and compact recoverable signatures.

use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SecretKey, SECP256K1,
};
use serde::{Deserialize, Serialize};

use crate::{
    address::Address,
    buf::{Buf32, Buf33, Buf65},
    errors::CryptoError,
    macros::impl_buf_wrapper,
};

/// Compressed secp256k1 public key as raw bytes.
///
/// The all-zero key is the "null key", it marks a retracted account and never
/// parses as a curve point.
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
pub struct PublicKey(Buf33);

impl_buf_wrapper!(PublicKey, Buf33);

impl PublicKey {
    pub const NULL: PublicKey = PublicKey(Buf33::zero());

    pub fn from_secp(pk: &secp256k1::PublicKey) -> Self {
        Self(Buf33::new(pk.serialize()))
    }

    pub fn from_secret(sk: &SecretKey) -> Self {
        Self::from_secp(&sk.public_key(SECP256K1))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_secp(&self) -> Result<secp256k1::PublicKey, CryptoError> {
        if self.is_null() {
            return Err(CryptoError::NullPublicKey);
        }
        secp256k1::PublicKey::from_slice(self.0.as_slice())
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Native address of this key.
    pub fn address(&self) -> Address {
        Address::from_pubkey(self)
    }
}

/// 65 byte compact signature: recovery id followed by r and s.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CompactSignature(Buf65);

impl_buf_wrapper!(CompactSignature, Buf65);

impl CompactSignature {
    /// Signs a 32 byte digest.
    pub fn sign(digest: &Buf32, sk: &SecretKey) -> Self {
        let msg = Message::from_digest(*digest.as_bytes());
        let sig = SECP256K1.sign_ecdsa_recoverable(&msg, sk);
        let (recid, rs) = sig.serialize_compact();

        let mut out = [0u8; 65];
        out[0] = recid.to_i32() as u8;
        out[1..].copy_from_slice(&rs);
        Self(Buf65::new(out))
    }

    /// Recovers the key that produced this signature over the digest.
    pub fn recover(&self, digest: &Buf32) -> Result<PublicKey, CryptoError> {
        let bytes = self.0.as_bytes();
        let recid =
            RecoveryId::from_i32(i32::from(bytes[0])).map_err(|_| CryptoError::InvalidSignature)?;
        let sig = RecoverableSignature::from_compact(&bytes[1..], recid)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let msg = Message::from_digest(*digest.as_bytes());
        let pk = SECP256K1
            .recover_ecdsa(&msg, &sig)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(PublicKey::from_secp(&pk))
    }
}

/// Parses a secret key from raw bytes.
pub fn secret_key_from_bytes(bytes: &[u8; 32]) -> Result<SecretKey, CryptoError> {
    SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidSecretKey)
}
