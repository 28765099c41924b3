// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CodeSync Core — Wallet Ownership Proofs
//!
//! The part of CodeSync that has to be right: a user proves control of an
//! Ethereum wallet by signing a challenge, and we bind that proof to a record
//! describing content they already pushed to IPFS.
//!
//! ## Architecture
//!
//! - **config** — Constants: app name, signing prefix, gateway, field limits.
//! - **crypto** — Keccak-256 and EIP-191 signer recovery over secp256k1.
//! - **identity** — Wallet addresses and the ephemeral identity proof.
//! - **challenge** — Challenge messages and the optional freshness policy.
//! - **registry** — Content records, indexed by id, content address and owner.
//! - **access** — Registration and access decisions built on the above.
//! - **validation** — Request field checks that run before any crypto.
//! - **error** — The client-facing error taxonomy.
//!
//! ## Ground Rules
//!
//! 1. The owner of a record is always the *recovered* signer, never the
//!    identity a caller claims.
//! 2. A record is never returned to anyone but its owner.
//! 3. Records are append-only. There is no update and no delete here.

pub mod access;
pub mod challenge;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod registry;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use access::{AccessController, AccessDecision};
pub use challenge::{build_challenge, ChallengePolicy};
pub use error::AccessError;
pub use identity::{Address, IdentityProof};
pub use registry::{ContentRecord, ContentRecordRegistry, InMemoryRegistry, SledRegistry};
