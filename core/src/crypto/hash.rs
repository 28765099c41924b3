//! # Hashing Utilities
//!
//! Keccak-256 is the only hash the ownership flow needs. It is *not* NIST
//! SHA3-256 (the padding differs), which is the single most common way to
//! get Ethereum address derivation wrong. `sha3::Keccak256` is the original
//! Keccak submission, which is what wallets use.

use sha3::{Digest, Keccak256};

use crate::config::{HASH_OUTPUT_LENGTH, PERSONAL_MESSAGE_PREFIX};

/// Compute the Keccak-256 digest of `data`.
///
/// # Example
///
/// ```
/// use codesync_core::crypto::keccak256;
///
/// let digest = keccak256(b"");
/// assert_eq!(
///     hex::encode(digest),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a message the way `personal_sign` / `eth_sign` do (EIP-191, 0x45).
///
/// The preimage is `"\x19Ethereum Signed Message:\n" || len || message`,
/// where `len` is the decimal byte length of the message. The prefix makes
/// a signed challenge useless as a signed transaction.
pub fn hash_personal_message(message: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}
