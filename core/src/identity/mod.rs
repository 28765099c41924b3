//! # Identity Module
//!
//! Who is asking. A participant is identified by an Ethereum-style wallet
//! address; proving that identity means presenting a message signed by the
//! address's key.
//!
//! 1. **Address** — 20 bytes, parsed case-insensitively, stored lowercase,
//!    displayed with an EIP-55 checksum when humans are looking.
//! 2. **Proof** — claimed address + signed message + signature, as it
//!    arrives over the wire. Nothing in a proof is trusted until
//!    [`recover_identity`](crate::crypto::recover_identity) says so.

pub mod address;
pub mod proof;

pub use address::{Address, AddressError};
pub use proof::IdentityProof;
