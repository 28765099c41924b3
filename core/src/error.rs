//! Error taxonomy for the ownership flow.
//!
//! Every failure a client can cause is an [`AccessError`]. None of them
//! should ever take the process down; the HTTP layer maps each variant to a
//! 4xx status. Storage failures are the only 5xx.

use thiserror::Error;

use crate::challenge::ChallengeError;
use crate::crypto::SignatureError;
use crate::identity::Address;
use crate::registry::RegistryError;
use crate::validation::ValidationError;

/// Errors that can occur while registering content or checking access.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Missing or malformed request fields. Never reaches crypto.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The signature does not decode or does not recover to any key.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// Recovery worked, but the signer is not who the caller claimed.
    #[error("signature recovered {recovered}, caller claimed {claimed}")]
    UnauthorizedSignature { claimed: Address, recovered: Address },

    /// The signed message fails the challenge freshness policy.
    #[error("challenge rejected: {0}")]
    StaleChallenge(#[from] ChallengeError),

    /// No record for the requested id or content address.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The record exists but belongs to someone else.
    #[error("access denied to {content_address}")]
    AccessDenied { content_address: String },

    /// The registry backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] RegistryError),
}

impl AccessError {
    /// Short, stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::UnauthorizedSignature { .. } => "unauthorized_signature",
            Self::StaleChallenge(_) => "stale_challenge",
            Self::RecordNotFound(_) => "record_not_found",
            Self::AccessDenied { .. } => "access_denied",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether the caller is at fault (as opposed to our storage).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let addr = Address::from_bytes([1u8; 20]);
        let errors = [
            AccessError::Validation(ValidationError::MissingField("x")),
            AccessError::InvalidSignature(SignatureError::InvalidHex),
            AccessError::UnauthorizedSignature {
                claimed: addr,
                recovered: addr,
            },
            AccessError::StaleChallenge(ChallengeError::Malformed("x")),
            AccessError::RecordNotFound("x".into()),
            AccessError::AccessDenied {
                content_address: "x".into(),
            },
            AccessError::Storage(RegistryError::Serialization("x".into())),
        ];
        let mut kinds: Vec<_> = errors.iter().map(AccessError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_only_storage_is_server_side() {
        assert!(AccessError::RecordNotFound("x".into()).is_client_error());
        assert!(!AccessError::Storage(RegistryError::Serialization("x".into())).is_client_error());
    }
}
