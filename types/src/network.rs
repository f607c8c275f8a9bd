//! Per-network parameter presets.
//!
//! All magic bytes, work thresholds, ports, and genesis keys are carried by a
//! `Network` value passed in at node construction; nothing is a process-wide
//! global. Three presets exist: test, beta, and live.

use crate::keys::RawKey;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// The genesis secret for the local test network.
const TEST_GENESIS_KEY: &str = "45B0E4F440F3B2D89C3E7A0A1D0E6F2B8C4D5E6F708192A3B4C5D6E7F8091A2B";
/// The genesis secret for the public beta network.
const BETA_GENESIS_KEY: &str = "1D1AA55BE9B83F1A6A16D98A486F1F2C8AA9B2C5D1E3F40516273849506A7B8C";
/// The distribution key for the live network.
const LIVE_GENESIS_KEY: &str = "E3F1B8C6D40A295E7D6C5B4A392817065F4E3D2C1B0A99887766554433221100";

/// Identifies which vela network a node participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Local test network: trivial work threshold, fast election timers.
    Test,
    /// Public test network with realistic parameters.
    Beta,
    /// The production network.
    Live,
}

impl Network {
    /// The two magic bytes prefixed to every wire message.
    pub fn magic(&self) -> [u8; 2] {
        match self {
            Self::Test => [b'R', b'A'],
            Self::Beta => [b'R', b'B'],
            Self::Live => [b'R', b'C'],
        }
    }

    /// Minimum accepted value of `Blake2b-64(work ‖ root)`.
    ///
    /// The test network threshold is zero so any nonce passes.
    pub fn work_threshold(&self) -> u64 {
        match self {
            Self::Test => 0x0000_0000_0000_0000,
            Self::Beta => 0xFFFF_FE00_0000_0000,
            Self::Live => 0xFFFF_FFC0_0000_0000,
        }
    }

    /// Default UDP/TCP port.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Test => 44300,
            Self::Beta => 54300,
            Self::Live => 7250,
        }
    }

    /// The human-readable address prefix (constant across networks).
    pub fn address_prefix(&self) -> &'static str {
        "vela"
    }

    /// The secret key the genesis block is signed with.
    pub fn genesis_key(&self) -> RawKey {
        let hex = match self {
            Self::Test => TEST_GENESIS_KEY,
            Self::Beta => BETA_GENESIS_KEY,
            Self::Live => LIVE_GENESIS_KEY,
        };
        RawKey::decode_hex(hex).expect("embedded genesis key is valid hex")
    }

    /// Interval between election announcement rounds.
    pub fn announcement_interval(&self) -> Duration {
        match self {
            Self::Test => Duration::from_millis(10),
            Self::Beta | Self::Live => Duration::from_secs(16),
        }
    }

    /// Interval between keepalive broadcasts; peers fall off after five
    /// silent periods.
    pub fn keepalive_period(&self) -> Duration {
        match self {
            Self::Test => Duration::from_secs(1),
            Self::Beta | Self::Live => Duration::from_secs(60),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Beta => "beta",
            Self::Live => "live",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "beta" => Ok(Self::Beta),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_distinct() {
        assert_eq!(Network::Test.magic(), [b'R', b'A']);
        assert_eq!(Network::Beta.magic(), [b'R', b'B']);
        assert_eq!(Network::Live.magic(), [b'R', b'C']);
    }

    #[test]
    fn test_network_work_is_trivial() {
        assert_eq!(Network::Test.work_threshold(), 0);
        assert!(Network::Live.work_threshold() > Network::Beta.work_threshold());
    }

    #[test]
    fn genesis_keys_decode() {
        for net in [Network::Test, Network::Beta, Network::Live] {
            let _ = net.genesis_key();
        }
    }

    #[test]
    fn parse_roundtrip() {
        for net in [Network::Test, Network::Beta, Network::Live] {
            assert_eq!(net.as_str().parse::<Network>().unwrap(), net);
        }
        assert!("mainnet".parse::<Network>().is_err());
    }
}
