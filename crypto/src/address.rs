//! Human-readable account addresses.
//!
//! Format: `<prefix>_` + 52 base-32 characters (4 zero bits then the 256-bit
//! public key) + 8 base-32 characters (a 40-bit Blake2b checksum of the key,
//! byte-reversed). The alphabet drops visually ambiguous characters.

use blake2::digest::consts::U5;
use blake2::{Blake2b, Digest};
use thiserror::Error;
use vela_types::Account;

/// Base32 alphabet (32 chars, avoids ambiguous 0/O, 2/Z, l/I, v).
const ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const DECODE_TABLE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Number of base32 characters for the public key (4 + 256 bits → 52).
const KEY_CHARS: usize = 52;
/// Number of base32 characters for the checksum (40 bits → 8).
const CHECKSUM_CHARS: usize = 8;

/// The address could not be decoded: wrong prefix, length, alphabet, or
/// checksum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("malformed account address")]
pub struct BadAddress;

type Blake2b40 = Blake2b<U5>;

/// 40-bit Blake2b of the key, byte-reversed.
fn checksum(key: &[u8; 32]) -> [u8; 5] {
    let digest = Blake2b40::digest(key);
    let mut out = [0u8; 5];
    for (i, byte) in digest.iter().enumerate() {
        out[4 - i] = *byte;
    }
    out
}

/// Encode the 256-bit key as 52 characters (a 4-bit zero pad keeps the bit
/// count divisible by five).
fn encode_key(key: &[u8; 32]) -> String {
    let mut out = String::with_capacity(KEY_CHARS);
    let mut buffer: u32 = 0;
    let mut bits = 4;
    for &byte in key {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    out
}

/// Decode 52 characters back into the key. The first character carries the
/// 4-bit pad, so its value must be 0 or 1.
fn decode_key(s: &str) -> Result<[u8; 32], BadAddress> {
    let chars = s.as_bytes();
    if chars.len() != KEY_CHARS {
        return Err(BadAddress);
    }
    let first = decode_char(chars[0])?;
    if first > 1 {
        return Err(BadAddress);
    }
    let mut out = [0u8; 32];
    let mut pos = 0;
    let mut buffer: u32 = first as u32;
    let mut bits = 1;
    for &c in &chars[1..] {
        buffer = (buffer << 5) | decode_char(c)? as u32;
        bits += 5;
        while bits >= 8 {
            bits -= 8;
            out[pos] = (buffer >> bits) as u8;
            pos += 1;
        }
    }
    debug_assert_eq!(pos, 32);
    Ok(out)
}

fn encode_checksum(sum: &[u8; 5]) -> String {
    let mut out = String::with_capacity(CHECKSUM_CHARS);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in sum {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    out
}

fn decode_checksum(s: &str) -> Result<[u8; 5], BadAddress> {
    let chars = s.as_bytes();
    if chars.len() != CHECKSUM_CHARS {
        return Err(BadAddress);
    }
    let mut out = [0u8; 5];
    let mut pos = 0;
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &c in chars {
        buffer = (buffer << 5) | decode_char(c)? as u32;
        bits += 5;
        while bits >= 8 {
            bits -= 8;
            out[pos] = (buffer >> bits) as u8;
            pos += 1;
        }
    }
    Ok(out)
}

fn decode_char(c: u8) -> Result<u8, BadAddress> {
    if c >= 128 {
        return Err(BadAddress);
    }
    let val = DECODE_TABLE[c as usize];
    if val == 0xFF {
        return Err(BadAddress);
    }
    Ok(val)
}

/// Encode an account as its human-readable address.
pub fn encode_account(prefix: &str, account: &Account) -> String {
    let key = account.as_bytes();
    format!(
        "{}_{}{}",
        prefix,
        encode_key(key),
        encode_checksum(&checksum(key))
    )
}

/// Decode a human-readable address back into an account.
pub fn decode_account(prefix: &str, address: &str) -> Result<Account, BadAddress> {
    let rest = address
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(BadAddress)?;
    if rest.len() != KEY_CHARS + CHECKSUM_CHARS {
        return Err(BadAddress);
    }
    let key = decode_key(&rest[..KEY_CHARS])?;
    let sum = decode_checksum(&rest[KEY_CHARS..])?;
    if sum != checksum(&key) {
        return Err(BadAddress);
    }
    Ok(Account::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    const PREFIX: &str = "vela";

    #[test]
    fn encode_shape() {
        let kp = KeyPair::generate();
        let addr = encode_account(PREFIX, &kp.public);
        assert!(addr.starts_with("vela_"));
        assert_eq!(addr.len(), 5 + 52 + 8);
    }

    #[test]
    fn roundtrip() {
        let kp = KeyPair::generate();
        let addr = encode_account(PREFIX, &kp.public);
        assert_eq!(decode_account(PREFIX, &addr).unwrap(), kp.public);
    }

    #[test]
    fn burn_account_roundtrip() {
        let addr = encode_account(PREFIX, &Account::ZERO);
        assert_eq!(decode_account(PREFIX, &addr).unwrap(), Account::ZERO);
    }

    #[test]
    fn wrong_prefix_rejected() {
        let kp = KeyPair::generate();
        let addr = encode_account(PREFIX, &kp.public);
        let renamed = addr.replacen("vela_", "nano_", 1);
        assert_eq!(decode_account(PREFIX, &renamed), Err(BadAddress));
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(decode_account(PREFIX, "vela_short"), Err(BadAddress));
        assert_eq!(decode_account(PREFIX, "vela_"), Err(BadAddress));
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let kp = KeyPair::generate();
        let mut addr = encode_account(PREFIX, &kp.public);
        let last = addr.pop().unwrap();
        addr.push(if last == '1' { '3' } else { '1' });
        assert_eq!(decode_account(PREFIX, &addr), Err(BadAddress));
    }

    #[test]
    fn bad_alphabet_rejected() {
        let kp = KeyPair::generate();
        let addr = encode_account(PREFIX, &kp.public);
        let bad: String = addr
            .char_indices()
            .map(|(i, c)| if i == 10 { '0' } else { c })
            .collect();
        assert_eq!(decode_account(PREFIX, &bad), Err(BadAddress));
    }

    #[test]
    fn distinct_keys_distinct_addresses() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(
            encode_account(PREFIX, &a.public),
            encode_account(PREFIX, &b.public)
        );
    }
}
