//! # Public Keys → Addresses
//!
//! A wallet address is the last 20 bytes of the Keccak-256 hash of the
//! uncompressed secp256k1 public key, without the `0x04` SEC1 tag.
//!
//! This module never sees a private key. Signing belongs to the user's
//! wallet; we only ever derive addresses from keys we recovered.

use k256::ecdsa::VerifyingKey;

use super::hash::keccak256;
use crate::config::ADDRESS_LENGTH;
use crate::identity::Address;

/// Derive the wallet address that owns `key`.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || X (32) || Y (32).
    let digest = keccak256(&point.as_bytes()[1..]);

    let mut bytes = [0u8; ADDRESS_LENGTH];
    bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    #[test]
    fn test_known_private_key_address() {
        // Private key 0x...01 is the generator point; its address is a
        // well-known constant across every Ethereum library.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let sk = SigningKey::from_slice(&secret).unwrap();
        let addr = address_from_verifying_key(sk.verifying_key());
        assert_eq!(
            addr.to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        let mut a = [0u8; 32];
        a[31] = 2;
        let mut b = [0u8; 32];
        b[31] = 3;
        let addr_a = address_from_verifying_key(SigningKey::from_slice(&a).unwrap().verifying_key());
        let addr_b = address_from_verifying_key(SigningKey::from_slice(&b).unwrap().verifying_key());
        assert_ne!(addr_a, addr_b);
    }
}
