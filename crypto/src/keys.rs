//! Key pair generation and derivation.

use crate::hash::blake2b_256_multi;
use crate::sign::derive_public_key;
use rand::rngs::OsRng;
use rand::RngCore;
use vela_types::{Account, RawKey};

/// An Ed25519 key pair.
pub struct KeyPair {
    pub private: RawKey,
    pub public: Account,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self::from_private(RawKey::new(bytes))
    }

    /// Reconstruct a key pair from a secret key.
    pub fn from_private(private: RawKey) -> Self {
        let public = derive_public_key(&private);
        Self { private, public }
    }
}

/// Derive the `index`-th secret key from a 32-byte seed.
///
/// `Blake2b-256(seed ‖ index_be32)`, the derivation wallets use, exposed
/// here for the CLI key helpers.
pub fn deterministic_key(seed: &RawKey, index: u32) -> RawKey {
    let digest = blake2b_256_multi(&[seed.as_bytes(), &index.to_be_bytes()]);
    RawKey::new(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public, b.public);
    }

    #[test]
    fn from_private_is_stable() {
        let prv = RawKey::new([3u8; 32]);
        let kp1 = KeyPair::from_private(prv.clone());
        let kp2 = KeyPair::from_private(prv);
        assert_eq!(kp1.public, kp2.public);
    }

    #[test]
    fn deterministic_key_varies_by_index() {
        let seed = RawKey::new([7u8; 32]);
        let k0 = deterministic_key(&seed, 0);
        let k1 = deterministic_key(&seed, 1);
        assert_ne!(k0.as_bytes(), k1.as_bytes());
        assert_eq!(
            deterministic_key(&seed, 0).as_bytes(),
            k0.as_bytes()
        );
    }
}
