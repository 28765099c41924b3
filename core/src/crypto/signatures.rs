//! # Signer Recovery
//!
//! Wallets sign challenges with `personal_sign`: an ECDSA signature over
//! secp256k1 of the EIP-191 hash of the message, serialized as 65 bytes
//! `r || s || v`. Instead of verifying against a known key we *recover* the
//! key from the signature and derive its address. Whoever asks for access
//! only has to tell us who they claim to be; the math tells us who they are.
//!
//! ## Strictness
//!
//! - Exactly 65 bytes of hex, optional `0x`. Anything else is rejected.
//! - `v` may be `27/28` (legacy, what wallets emit) or `0/1` (raw parity).
//!   EIP-155 style `v >= 35` never applies to messages and is rejected.
//! - High-`s` signatures are normalized (and the parity flipped) before
//!   recovery. They recover the same key; some older signers emit them.
//! - Zero or out-of-range `r`/`s` are rejected by `k256` itself.
//!
//! Recovery failure never yields a "best effort" address. Either we get the
//! exact key that produced the signature or an error.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

use super::hash::hash_personal_message;
use super::keys::address_from_verifying_key;
use crate::config::SIGNATURE_LENGTH;
use crate::identity::Address;

/// Errors during signature decoding and recovery.
///
/// Deliberately coarse on the wire (everything maps to "Invalid signature")
/// but detailed enough here to debug a misbehaving client from the logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    InvalidHex,

    #[error("invalid signature length: expected {SIGNATURE_LENGTH} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("signature scalars out of range")]
    InvalidScalars,

    #[error("no public key recoverable from signature")]
    RecoveryFailed,
}

/// Capability to turn a `(message, signature)` pair into the signer's
/// address.
///
/// [`AccessController`](crate::access::AccessController) only depends on
/// this trait, so the curve implementation can be swapped (hardware module,
/// remote verifier, test double) without touching access logic.
pub trait IdentityRecoverer: Send + Sync {
    /// Recover the address whose key produced `signature` over `message`.
    fn recover_identity(&self, message: &str, signature: &str) -> Result<Address, SignatureError>;
}

/// The default recoverer: EIP-191 personal messages over secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Recoverer;

impl IdentityRecoverer for Secp256k1Recoverer {
    fn recover_identity(&self, message: &str, signature: &str) -> Result<Address, SignatureError> {
        recover_identity(message, signature)
    }
}

/// Recover the signer address of an EIP-191 personal message.
///
/// # Example
///
/// ```no_run
/// use codesync_core::crypto::recover_identity;
///
/// let signer = recover_identity("hello", "0x…65 bytes of hex…")?;
/// println!("signed by {signer}");
/// # Ok::<(), codesync_core::crypto::SignatureError>(())
/// ```
pub fn recover_identity(message: &str, signature: &str) -> Result<Address, SignatureError> {
    let raw = decode_signature(signature)?;
    let prehash = hash_personal_message(message.as_bytes());
    let key = recover_verifying_key(&prehash, &raw)?;
    Ok(address_from_verifying_key(&key))
}

/// Recover the verifying key from a raw 65-byte signature over `prehash`.
pub fn recover_verifying_key(
    prehash: &[u8; 32],
    raw: &[u8; SIGNATURE_LENGTH],
) -> Result<VerifyingKey, SignatureError> {
    let mut recovery_id = parse_recovery_id(raw[64])?;
    let mut signature =
        Signature::from_slice(&raw[..64]).map_err(|_| SignatureError::InvalidScalars)?;

    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)
}

/// Decode a hex signature (with or without `0x`) into its 65 raw bytes.
pub fn decode_signature(signature: &str) -> Result<[u8; SIGNATURE_LENGTH], SignatureError> {
    let trimmed = signature.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(digits).map_err(|_| SignatureError::InvalidHex)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidLength(len))
}

/// Map the trailing `v` byte to a recovery id.
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    RecoveryId::from_byte(parity).ok_or(SignatureError::InvalidRecoveryId(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestSigner;

    #[test]
    fn test_recover_roundtrip() {
        let signer = TestSigner::from_seed(7);
        let msg = "CodeSync - Verify ownership of wallet: x\nTimestamp: 1";
        let sig = signer.sign_personal(msg);
        assert_eq!(recover_identity(msg, &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_recover_accepts_missing_prefix() {
        let signer = TestSigner::from_seed(8);
        let sig = signer.sign_personal("hi");
        let bare = sig.trim_start_matches("0x");
        assert_eq!(recover_identity("hi", bare).unwrap(), signer.address());
    }

    #[test]
    fn test_recover_accepts_raw_parity_v() {
        let signer = TestSigner::from_seed(9);
        let mut raw = decode_signature(&signer.sign_personal("parity")).unwrap();
        raw[64] -= 27;
        let sig = format!("0x{}", hex::encode(raw));
        assert_eq!(recover_identity("parity", &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_tampered_message_recovers_different_identity() {
        let signer = TestSigner::from_seed(10);
        let sig = signer.sign_personal("transfer ownership to alice");
        if let Ok(addr) = recover_identity("transfer ownership to mallory", &sig) {
            assert_ne!(addr, signer.address());
        }
    }

    #[test]
    fn test_every_single_bit_flip_in_signature_breaks_identity() {
        let signer = TestSigner::from_seed(11);
        let msg = "bit flips";
        let raw = decode_signature(&signer.sign_personal(msg)).unwrap();

        for byte in 0..64 {
            for bit in 0..8 {
                let mut mutated = raw;
                mutated[byte] ^= 1 << bit;
                let sig = hex::encode(mutated);
                if let Ok(addr) = recover_identity(msg, &sig) {
                    assert_ne!(addr, signer.address(), "byte {byte} bit {bit}");
                }
            }
        }
    }

    #[test]
    fn test_flipped_parity_recovers_different_identity() {
        let signer = TestSigner::from_seed(12);
        let mut raw = decode_signature(&signer.sign_personal("v flip")).unwrap();
        raw[64] = if raw[64] == 27 { 28 } else { 27 };
        if let Ok(addr) = recover_identity("v flip", &hex::encode(raw)) {
            assert_ne!(addr, signer.address());
        }
    }

    #[test]
    fn test_high_s_signature_recovers_same_identity() {
        let signer = TestSigner::from_seed(13);
        let raw = decode_signature(&signer.sign_personal("malleable")).unwrap();
        let sig = Signature::from_slice(&raw[..64]).unwrap();
        let high = Signature::from_scalars(
            k256::FieldBytes::from(sig.r()),
            k256::FieldBytes::from(-sig.s()),
        )
        .unwrap();
        assert!(high.normalize_s().is_some());

        let mut mutated = [0u8; SIGNATURE_LENGTH];
        mutated[..64].copy_from_slice(&high.to_bytes());
        mutated[64] = if raw[64] == 27 { 28 } else { 27 };

        let recovered = recover_identity("malleable", &hex::encode(mutated)).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            recover_identity("m", "0xdeadbeef"),
            Err(SignatureError::InvalidLength(4))
        );
    }

    #[test]
    fn test_non_hex_rejected() {
        let sig = format!("0x{}", "zz".repeat(65));
        assert_eq!(recover_identity("m", &sig), Err(SignatureError::InvalidHex));
    }

    #[test]
    fn test_bad_recovery_id_rejected() {
        let signer = TestSigner::from_seed(14);
        let mut raw = decode_signature(&signer.sign_personal("v")).unwrap();
        raw[64] = 37;
        assert_eq!(
            recover_identity("v", &hex::encode(raw)),
            Err(SignatureError::InvalidRecoveryId(37))
        );
    }

    #[test]
    fn test_zero_scalars_rejected() {
        let mut raw = [0u8; SIGNATURE_LENGTH];
        raw[64] = 27;
        assert_eq!(
            recover_identity("m", &hex::encode(raw)),
            Err(SignatureError::InvalidScalars)
        );
    }

    #[test]
    fn test_trait_object_recoverer() {
        let signer = TestSigner::from_seed(15);
        let recoverer: Box<dyn IdentityRecoverer> = Box::new(Secp256k1Recoverer);
        let sig = signer.sign_personal("dyn");
        assert_eq!(
            recoverer.recover_identity("dyn", &sig).unwrap(),
            signer.address()
        );
    }
}
