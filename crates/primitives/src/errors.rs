//! Errors during parsing/handling/conversion of primitives.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid buffer length: expected {expected}, got {got}")]
pub struct BufLenError {
    pub expected: usize,
    pub got: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("null public key")]
    NullPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signature recovery failed")]
    RecoveryFailed,

    #[error("invalid secret key")]
    InvalidSecretKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("zero denominator building price")]
    ZeroDenominator,

    #[error("price arithmetic overflow")]
    Overflow,

    #[error("negative amount {0} in price conversion")]
    NegativeAmount(i64),

    #[error("price asset mismatch: expected {expected}, got {got}")]
    AssetMismatch { expected: u32, got: u32 },
}
