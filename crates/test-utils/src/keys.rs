use dexchain_primitives::{address::Address, keys::PublicKey, SecretKey};
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Secret key number `n`.  Same `n`, same key, across runs.
pub fn secret(n: u8) -> SecretKey {
    let mut bytes = [n.max(1); 32];
    bytes[0] = 0x11;
    // [0x11, n, n, ...] is always below the curve order
    SecretKey::from_slice(&bytes).unwrap_or_else(|_| panic!("bad test key {n}"))
}

pub fn public(n: u8) -> PublicKey {
    PublicKey::from_secret(&secret(n))
}

pub fn address(n: u8) -> Address {
    public(n).address()
}

/// `count` keys drawn from an RNG seeded with `seed`.
pub fn seeded_secrets(seed: u64, count: usize) -> Vec<SecretKey> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if let Ok(sk) = SecretKey::from_slice(&bytes) {
            out.push(sk);
        }
    }
    out
}
