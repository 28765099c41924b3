//! Test helpers: a wallet that can sign challenges.
//!
//! Compiled for this crate's tests and, with the `test-utils` feature, for
//! downstream test suites (the server's router tests use it).

use k256::ecdsa::SigningKey;

use crate::challenge::ChallengeBuilder;
use crate::crypto::{address_from_verifying_key, hash_personal_message};
use crate::identity::{Address, IdentityProof};

/// A throwaway wallet that signs like `personal_sign` does.
#[derive(Clone)]
pub struct TestSigner {
    key: SigningKey,
    address: Address,
}

impl TestSigner {
    /// Deterministic signer. The secret key is `seed` as a 256-bit integer,
    /// so `from_seed(1)` is the well-known `0x7e5f…5bdf` wallet.
    ///
    /// # Panics
    ///
    /// If `seed` is zero.
    pub fn from_seed(seed: u8) -> Self {
        assert_ne!(seed, 0, "secret key must be non-zero");
        let mut secret = [0u8; 32];
        secret[31] = seed;
        let key = SigningKey::from_slice(&secret).expect("non-zero scalar is a valid key");
        Self::from_key(key)
    }

    /// A signer with a fresh random key.
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand_core::OsRng))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `message` as an EIP-191 personal message. Returns `0x` hex of
    /// `r || s || v` with `v` in `{27, 28}`.
    pub fn sign_personal(&self, message: &str) -> String {
        let prehash = hash_personal_message(message.as_bytes());
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .expect("signing a 32-byte prehash cannot fail");

        let mut raw = [0u8; 65];
        raw[..64].copy_from_slice(&signature.to_bytes());
        raw[64] = 27 + recovery_id.to_byte();
        format!("0x{}", hex::encode(raw))
    }

    /// A proof over `message` that claims this signer's own address.
    pub fn proof(&self, message: &str) -> IdentityProof {
        IdentityProof::new(self.address.to_string(), message, self.sign_personal(message))
    }

    /// A proof over a fresh challenge for this signer.
    pub fn challenge_proof(&self) -> IdentityProof {
        let message = ChallengeBuilder::default().build(&self.address);
        self.proof(&message)
    }
}

impl std::fmt::Debug for TestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_one_is_known_wallet() {
        assert_eq!(
            TestSigner::from_seed(1).address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_random_signers_differ() {
        assert_ne!(TestSigner::random().address(), TestSigner::random().address());
    }

    #[test]
    fn test_signature_shape() {
        let sig = TestSigner::from_seed(3).sign_personal("shape");
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 130);
        assert!(sig.ends_with("1b") || sig.ends_with("1c"));
    }
}
