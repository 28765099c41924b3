//! The identity proof a client presents with each request.

use serde::{Deserialize, Serialize};

/// A claimed identity plus a signed message that should prove it.
///
/// Proofs are ephemeral. Only the message and signature outlive the request,
/// as the audit trail on a [`ContentRecord`](crate::registry::ContentRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProof {
    /// The address the caller says they control, in any letter case.
    pub claimed_identity: String,
    /// The exact message the wallet signed.
    pub message: String,
    /// Hex-encoded 65-byte `r || s || v` signature.
    pub signature: String,
}

impl IdentityProof {
    pub fn new(
        claimed_identity: impl Into<String>,
        message: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            claimed_identity: claimed_identity.into(),
            message: message.into(),
            signature: signature.into(),
        }
    }
}
