//! # Wallet Addresses
//!
//! An address is 20 bytes. Everything else is presentation:
//!
//! ```text
//! 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf   <- canonical (what we store)
//! 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf   <- EIP-55 checksum (display)
//! ```
//!
//! Wallets hand out the checksummed form and users paste whatever they have,
//! so parsing is case-insensitive and equality is byte equality. Owner fields
//! in the registry always hold the lowercase canonical form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::hash::keccak256;

/// Errors that can occur while parsing an address string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The string does not start with `0x`.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// Wrong number of hex digits after the prefix.
    #[error("invalid address length: expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// A non-hex character was found.
    #[error("address contains non-hex characters")]
    InvalidHex,
}

/// A 20-byte wallet address.
///
/// # Examples
///
/// ```
/// use codesync_core::identity::Address;
///
/// let a: Address = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap();
/// let b: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
/// assert_eq!(a.to_checksum(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Parse `0x` + 40 hex digits, any letter case.
    ///
    /// The checksum in mixed-case input is *not* enforced: a wrong checksum
    /// only means the user typed the address by hand, and a typo would make
    /// the signature recover to a different address anyway.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }

    /// Canonical lowercase `0x…` form. Same as `Display`.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum form.
    ///
    /// A hex letter is uppercased when the matching nibble of
    /// `keccak256(lowercase_hex)` is 8 or higher.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Case-insensitive comparison against an arbitrary string.
    ///
    /// Returns `false` for strings that are not addresses at all.
    pub fn matches(&self, other: &str) -> bool {
        Self::parse(other).map(|o| o == *self).unwrap_or(false)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_parse_is_case_insensitive() {
        let a = Address::parse(CHECKSUMMED).unwrap();
        let b = Address::parse(&CHECKSUMMED.to_lowercase()).unwrap();
        let c = Address::parse(&CHECKSUMMED.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_display_is_lowercase() {
        let a = Address::parse(CHECKSUMMED).unwrap();
        assert_eq!(a.to_string(), CHECKSUMMED.to_lowercase());
    }

    #[test]
    fn test_eip55_vectors() {
        // Reference vectors from EIP-55.
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let addr = Address::parse(expected).unwrap();
            assert_eq!(addr.to_checksum(), expected);
        }
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert_eq!(
            Address::parse("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            Err(AddressError::MissingPrefix)
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(Address::parse("0xabc"), Err(AddressError::InvalidLength(3)));
    }

    #[test]
    fn test_non_hex_rejected() {
        let bad = format!("0x{}", "g".repeat(40));
        assert_eq!(Address::parse(&bad), Err(AddressError::InvalidHex));
    }

    #[test]
    fn test_matches_ignores_case_and_garbage() {
        let a = Address::parse(CHECKSUMMED).unwrap();
        assert!(a.matches(&CHECKSUMMED.to_lowercase()));
        assert!(!a.matches("not an address"));
    }

    #[test]
    fn test_serde_as_lowercase_string() {
        let a = Address::parse(CHECKSUMMED).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED.to_lowercase()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
