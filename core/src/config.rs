//! # Configuration & Constants
//!
//! Every magic number in CodeSync's ownership flow lives here. Challenge
//! wording, signing prefixes and field limits are part of the contract with
//! wallets and the UI, so changing any of them is a breaking change.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version of the record/challenge contract exposed over HTTP.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// Application name embedded at the start of every challenge message.
pub const APP_NAME: &str = "CodeSync";

/// Text between the app name and the wallet address in a challenge.
pub const CHALLENGE_INFIX: &str = " - Verify ownership of wallet: ";

/// Label of the timestamp line in a challenge.
pub const CHALLENGE_TIMESTAMP_LABEL: &str = "Timestamp: ";

/// Default tolerance for challenges stamped slightly in the future when the
/// freshness policy is enforced. Client clocks drift; 30 seconds is plenty.
pub const DEFAULT_MAX_FUTURE_SKEW: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// EIP-191 version 0x45 prefix. The decimal byte length of the message is
/// appended after the newline, then the message itself.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Recoverable secp256k1 signature: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Wallet address length in bytes (last 20 bytes of keccak256(pubkey)).
pub const ADDRESS_LENGTH: usize = 20;

/// Keccak-256 digest length.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Content Addressing
// ---------------------------------------------------------------------------

/// Public gateway used to build browsable URLs for stored content.
pub const GATEWAY_BASE_URL: &str = "https://w3s.link/ipfs/";

/// Upper bound on a content address. Real CIDs are well under 100 chars.
pub const MAX_CONTENT_ADDRESS_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Request Limits
// ---------------------------------------------------------------------------

/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 256;

/// Maximum signed message length, in bytes. Challenges are ~120 bytes;
/// anything near this limit was not produced by us.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 5000;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Builds the public gateway URL for a content address.
pub fn gateway_url(content_address: &str) -> String {
    format!("{GATEWAY_BASE_URL}{content_address}")
}
