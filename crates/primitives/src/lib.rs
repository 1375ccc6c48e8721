//! Collection of generic data types that are used widely across the ledger:
//! byte buffers, hashes, addresses, keys, timestamps, amounts and prices.

mod macros;

pub mod address;
pub mod amount;
pub mod buf;
pub mod errors;
pub mod hash;
pub mod ids;
pub mod keys;
pub mod price;
pub mod time;

pub mod prelude {
    pub use crate::{
        address::{Address, PtsAddress},
        amount::{Amount, Asset},
        buf::{Buf20, Buf32, Buf33, Buf65},
        ids::{AccountId, AssetId, SlateId},
        keys::{CompactSignature, PublicKey},
        price::{Price, PRICE_PRECISION},
        time::Timestamp,
    };
}

pub use secp256k1::SecretKey;
