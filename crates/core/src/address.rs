//! Account addresses
//!
//! An address is 20 bytes, written as `0x` followed by exactly 40 hex digits.
//! Parsing is case-insensitive for both the prefix and the digits; rendering
//! is always lowercase.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in an address
pub const ADDRESS_BYTES: usize = 20;

/// Number of characters in a hex-encoded address including the prefix
pub const ADDRESS_HEX_LEN: usize = 2 + ADDRESS_BYTES * 2;

/// A 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    /// The zero address
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Wrap raw bytes
    pub const fn new(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Address(bytes)
    }

    /// Address whose low 8 bytes hold `value` (big-endian)
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes[ADDRESS_BYTES - 8..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    /// Take the last 20 bytes of a 32-byte word
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&word[32 - ADDRESS_BYTES..]);
        Address(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Left-pad to a 32-byte word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[32 - ADDRESS_BYTES..].copy_from_slice(&self.0);
        word
    }

    /// Check for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }

    /// Parse a hex address
    ///
    /// Errors are reported by cause, checked in this order:
    /// - wrong total length → `InvalidAddressLength`
    /// - no `0x`/`0X` prefix → `MissingPrefix`
    /// - a digit outside `[0-9a-fA-F]` → `InvalidHexCharacter`
    pub fn parse(value: &str) -> Result<Self> {
        let length = value.chars().count();
        if length != ADDRESS_HEX_LEN {
            return Err(Error::InvalidAddressLength {
                value: value.to_string(),
                length,
            });
        }
        if !(value.starts_with("0x") || value.starts_with("0X")) {
            return Err(Error::MissingPrefix(value.to_string()));
        }

        let mut bytes = [0u8; ADDRESS_BYTES];
        let mut high = 0u8;
        for (i, c) in value.chars().skip(2).enumerate() {
            let nibble = c.to_digit(16).ok_or_else(|| Error::InvalidHexCharacter {
                value: value.to_string(),
                character: c,
            })? as u8;
            if i % 2 == 0 {
                high = nibble;
            } else {
                bytes[i / 2] = (high << 4) | nibble;
            }
        }
        Ok(Address(bytes))
    }

    /// Check whether `value` is a well-formed hex address
    pub fn is_hex_address(value: &str) -> bool {
        Address::parse(value).is_ok()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Address(bytes)
    }
}
