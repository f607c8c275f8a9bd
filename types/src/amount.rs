//! The 128-bit amount type used for balances and voting weight.
//!
//! Amounts are raw integer units (u128); there is no fractional
//! representation. On the wire and on disk they serialize as 16 big-endian
//! bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// The total supply created in the genesis block.
pub const GENESIS_AMOUNT: Amount = Amount::MAX;

/// A quantity of currency or voting weight, in raw units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Wire and disk form: 16 bytes, big-endian.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_bytes_roundtrip() {
        let a = Amount::new(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
        assert_eq!(Amount::from_be_bytes(a.to_be_bytes()), a);
    }

    #[test]
    fn be_bytes_order() {
        let a = Amount::new(1);
        let bytes = a.to_be_bytes();
        assert_eq!(bytes[15], 1);
        assert!(bytes[..15].iter().all(|&b| b == 0));
    }

    #[test]
    fn checked_sub_underflow() {
        assert!(Amount::new(5).checked_sub(Amount::new(6)).is_none());
        assert_eq!(
            Amount::new(5).checked_sub(Amount::new(5)),
            Some(Amount::ZERO)
        );
    }

    #[test]
    fn genesis_amount_is_max() {
        assert_eq!(GENESIS_AMOUNT.raw(), u128::MAX);
    }
}
