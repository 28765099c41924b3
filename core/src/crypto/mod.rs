//! # Cryptographic Primitives
//!
//! Everything the ownership flow needs from cryptography, and nothing more:
//!
//! - **Keccak-256** for address derivation and message hashing.
//! - **EIP-191 personal messages** so a signed challenge can never double as
//!   a signed transaction.
//! - **secp256k1 public-key recovery** via `k256`, to learn who signed.
//!
//! We never hold private keys. Signing happens in the user's wallet.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{hash_personal_message, keccak256};
pub use keys::address_from_verifying_key;
pub use signatures::{
    decode_signature, recover_identity, IdentityRecoverer, Secp256k1Recoverer, SignatureError,
};
