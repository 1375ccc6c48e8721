//! Fixed-size byte buffers used for hashes, addresses, keys and signatures.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::macros::impl_buf_common;

/// 20 byte buffer, the size of a ripemd160 or hash160 output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Buf20(pub [u8; 20]);

impl_buf_common!(Buf20, 20);

/// 32 byte buffer, the size of a sha256 output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Buf32(pub [u8; 32]);

impl_buf_common!(Buf32, 32);

/// 33 byte buffer, the size of a compressed secp256k1 point.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Buf33(pub [u8; 33]);

impl_buf_common!(Buf33, 33);

/// 65 byte buffer, the size of a compact recoverable signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Buf65(pub [u8; 65]);

impl_buf_common!(Buf65, 65);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buf32_serde_hex_roundtrip() {
        let buf = Buf32::new([7u8; 32]);
        let json = serde_json::to_string(&buf).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));

        let decoded: Buf32 = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, buf);
    }

    #[test]
    fn test_buf_deserialize_accepts_0x_prefix() {
        let json = format!("\"0x{}\"", "ab".repeat(20));
        let decoded: Buf20 = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, Buf20::new([0xab; 20]));
    }

    #[test]
    fn test_buf_deserialize_rejects_wrong_length() {
        let json = format!("\"{}\"", "ab".repeat(19));
        assert!(serde_json::from_str::<Buf20>(&json).is_err());
    }

    #[test]
    fn test_buf_try_from_slice() {
        let bytes = [1u8; 33];
        let buf = Buf33::try_from(&bytes[..]).unwrap();
        assert_eq!(buf.as_bytes(), &bytes);

        let err = Buf33::try_from(&bytes[..32]).unwrap_err();
        assert_eq!(err.expected, 33);
        assert_eq!(err.got, 32);
    }

    #[test]
    fn test_display_is_truncated() {
        let buf = Buf32::new([0xff; 32]);
        assert_eq!(buf.to_string(), "ffffff..ffffff");
        assert!(Buf32::zero().is_zero());
    }
}
