//! Difficulty reporting.
//!
//! Operators reason about work in multiples of the network threshold: a
//! multiplier of 2 means the nonce clears a bar twice as hard to reach.
//! The mapping inverts the acceptance gap, `u64::MAX - threshold`.

/// How many times harder `value` is than `base`.
///
/// Returns 0.0 when the value does not even meet the base.
pub fn to_multiplier(value: u64, base: u64) -> f64 {
    if value < base {
        return 0.0;
    }
    let base_gap = (u64::MAX - base).max(1);
    let value_gap = (u64::MAX - value).max(1);
    base_gap as f64 / value_gap as f64
}

/// The threshold that is `multiplier` times harder than `base`.
pub fn from_multiplier(multiplier: f64, base: u64) -> u64 {
    if multiplier <= 0.0 {
        return 0;
    }
    let base_gap = (u64::MAX - base) as f64;
    let scaled = (base_gap / multiplier) as u64;
    u64::MAX - scaled
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u64 = 0xFFFF_FFC0_0000_0000;

    #[test]
    fn base_is_multiplier_one() {
        let multiplier = to_multiplier(BASE, BASE);
        assert!((multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn halving_the_gap_doubles_the_multiplier() {
        let gap = u64::MAX - BASE;
        let harder = u64::MAX - gap / 2;
        let multiplier = to_multiplier(harder, BASE);
        assert!((multiplier - 2.0).abs() < 1e-6);
    }

    #[test]
    fn below_base_is_zero() {
        assert_eq!(to_multiplier(BASE - 1, BASE), 0.0);
    }

    #[test]
    fn roundtrip_through_multiplier() {
        for multiplier in [1.0, 2.0, 8.0, 64.0] {
            let threshold = from_multiplier(multiplier, BASE);
            let back = to_multiplier(threshold, BASE);
            assert!((back - multiplier).abs() / multiplier < 1e-6);
        }
    }
}
