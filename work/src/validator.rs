//! Work validation.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use vela_types::BlockHash;

type Blake2b64 = Blake2b<U8>;

/// The 64-bit work value for a nonce against a root.
///
/// Blake2b with an 8-byte digest over `nonce_le ‖ root`, read little-endian.
pub fn work_value(root: &BlockHash, nonce: u64) -> u64 {
    let mut hasher = Blake2b64::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(root.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest);
    u64::from_le_bytes(bytes)
}

/// Whether a nonce satisfies the threshold for the given root.
pub fn validate_work(root: &BlockHash, nonce: u64, threshold: u64) -> bool {
    work_value(root, nonce) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_accepts_anything() {
        assert!(validate_work(&BlockHash::new([0x11; 32]), 0, 0));
        assert!(validate_work(&BlockHash::new([0x11; 32]), 12345, 0));
    }

    #[test]
    fn max_threshold_rejects() {
        // A work value of exactly u64::MAX has negligible probability.
        assert!(!validate_work(&BlockHash::new([0x22; 32]), 12345, u64::MAX));
    }

    #[test]
    fn value_depends_on_root() {
        let a = work_value(&BlockHash::new([0x01; 32]), 7);
        let b = work_value(&BlockHash::new([0x02; 32]), 7);
        assert_ne!(a, b);
    }

    #[test]
    fn value_depends_on_nonce() {
        let root = BlockHash::new([0x03; 32]);
        assert_ne!(work_value(&root, 1), work_value(&root, 2));
    }

    #[test]
    fn boundary_is_inclusive() {
        let root = BlockHash::new([0x04; 32]);
        let value = work_value(&root, 99);
        assert!(validate_work(&root, 99, value));
        assert!(!validate_work(&root, 99, value + 1));
    }
}
