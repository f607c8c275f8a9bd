//! Ed25519 signing and verification with Blake2b-512 as the internal hash.
//!
//! Standard Ed25519 uses SHA-512 both for secret-key expansion and for the
//! challenge hash; this protocol substitutes Blake2b-512 in both places, so
//! `ed25519_dalek`'s high-level `SigningKey` cannot be used directly. The
//! `hazmat` entry points take the digest as a type parameter.

use blake2::{Blake2b512, Digest};
use ed25519_dalek::hazmat::{raw_sign, raw_verify, ExpandedSecretKey};
use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use vela_types::{Account, RawKey, Signature};

fn expand(prv: &RawKey) -> ExpandedSecretKey {
    let digest = Blake2b512::digest(prv.as_bytes());
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&digest);
    ExpandedSecretKey::from_bytes(&bytes)
}

/// Derive the public key (account) for a secret key.
pub fn derive_public_key(prv: &RawKey) -> Account {
    let esk = expand(prv);
    let verifying = VerifyingKey::from(&esk);
    Account::new(verifying.to_bytes())
}

/// Sign a message. `public` must be the key derived from `prv`.
pub fn sign_message(prv: &RawKey, public: &Account, message: &[u8]) -> Signature {
    let esk = expand(prv);
    let verifying = VerifyingKey::from(&esk);
    debug_assert_eq!(&verifying.to_bytes(), public.as_bytes());
    let signature = raw_sign::<Blake2b512>(&esk, message, &verifying);
    Signature::new(signature.to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Returns `false` for malformed public keys as well as bad signatures; a
/// forged or corrupt input is never an error, just a rejection.
pub fn verify_message(public: &Account, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying) = VerifyingKey::from_bytes(public.as_bytes()) else {
        return false;
    };
    let signature = DalekSignature::from_bytes(signature.as_bytes());
    raw_verify::<Blake2b512>(&verifying, message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate();
        let sig = sign_message(&kp.private, &kp.public, b"message");
        assert!(verify_message(&kp.public, b"message", &sig));
    }

    #[test]
    fn wrong_message_rejected() {
        let kp = KeyPair::generate();
        let sig = sign_message(&kp.private, &kp.public, b"message");
        assert!(!verify_message(&kp.public, b"other", &sig));
    }

    #[test]
    fn wrong_key_rejected() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let sig = sign_message(&kp1.private, &kp1.public, b"message");
        assert!(!verify_message(&kp2.public, b"message", &sig));
    }

    #[test]
    fn zero_signature_rejected() {
        let kp = KeyPair::generate();
        assert!(!verify_message(&kp.public, b"message", &Signature::ZERO));
    }

    #[test]
    fn derivation_is_deterministic() {
        let prv = RawKey::new([9u8; 32]);
        assert_eq!(derive_public_key(&prv), derive_public_key(&prv));
    }
}
