//! Request field validation.
//!
//! Runs before any cryptography: a request that is missing fields or has an
//! obviously malformed content address never costs us a curve operation.

use thiserror::Error;

use crate::config::{MAX_CONTENT_ADDRESS_LENGTH, MAX_DISPLAY_NAME_LENGTH, MAX_MESSAGE_LENGTH};
use crate::identity::{Address, AddressError, IdentityProof};

/// A missing or malformed request field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid claimed identity: {0}")]
    InvalidIdentity(#[from] AddressError),

    #[error("invalid content address: {0}")]
    InvalidContentAddress(&'static str),

    #[error("{field} exceeds {max} {unit}")]
    TooLong {
        field: &'static str,
        max: usize,
        unit: &'static str,
    },
}

/// Check a proof's fields. Returns the parsed claimed address.
pub fn validate_proof(proof: &IdentityProof) -> Result<Address, ValidationError> {
    require("claimedIdentity", &proof.claimed_identity)?;
    require("message", &proof.message)?;
    require("signature", &proof.signature)?;

    if proof.message.len() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "message",
            max: MAX_MESSAGE_LENGTH,
            unit: "bytes",
        });
    }

    Ok(Address::parse(&proof.claimed_identity)?)
}

/// Content addresses are CIDs: CIDv0 (`Qm…`, base58btc) or CIDv1 in a
/// multibase string encoding (`bafy…`, base32). Both are plain ASCII
/// alphanumerics. We do not decode the multihash; the upload service already
/// vouched for it.
pub fn validate_content_address(content_address: &str) -> Result<(), ValidationError> {
    require("contentAddress", content_address)?;

    if content_address.len() > MAX_CONTENT_ADDRESS_LENGTH {
        return Err(ValidationError::TooLong {
            field: "contentAddress",
            max: MAX_CONTENT_ADDRESS_LENGTH,
            unit: "characters",
        });
    }
    if !content_address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidContentAddress(
            "only ASCII letters and digits are allowed",
        ));
    }
    Ok(())
}

pub fn validate_display_name(display_name: &str) -> Result<(), ValidationError> {
    require("displayName", display_name)?;

    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "displayName",
            max: MAX_DISPLAY_NAME_LENGTH,
            unit: "characters",
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
