//! CPU nonce searcher for tests and the dev CLI.

use crate::validator::validate_work;
use rand::RngCore;
use vela_types::BlockHash;

/// How many nonces to try before giving up.
const MAX_ITERATIONS: u64 = 1 << 28;

/// Search for a nonce satisfying `threshold` for `root`.
///
/// Starts from a random offset so concurrent searchers do not duplicate
/// effort. Returns `None` if the iteration budget is exhausted, which only
/// happens for thresholds far above the network presets.
pub fn generate_work(root: &BlockHash, threshold: u64) -> Option<u64> {
    let mut rng = rand::thread_rng();
    let mut nonce = rng.next_u64();
    for _ in 0..MAX_ITERATIONS {
        if validate_work(root, nonce, threshold) {
            return Some(nonce);
        }
        nonce = nonce.wrapping_add(1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_nonce_validates() {
        let root = BlockHash::new([0xDE; 32]);
        // Low difficulty so the search finishes immediately.
        let threshold = 0x0000_0100_0000_0000;
        let nonce = generate_work(&root, threshold).unwrap();
        assert!(validate_work(&root, nonce, threshold));
    }

    #[test]
    fn zero_threshold_returns_first_nonce() {
        let root = BlockHash::new([0x00; 32]);
        assert!(generate_work(&root, 0).is_some());
    }
}
