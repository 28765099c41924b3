//! # Access Control
//!
//! The two flows that need a proof of wallet ownership:
//!
//! ```text
//! register_content:  validate -> recover -> recovered == claimed? -> policy -> create
//! verify_and_fetch:  validate -> lookup  -> recover -> recovered == claimed? -> policy -> owner?
//! ```
//!
//! The recovered address is the only identity we trust. The claimed identity
//! is a consistency check: a proof that recovers to someone other than who
//! the caller says they are is rejected outright, never "corrected".
//!
//! `verify_and_fetch` looks the record up before touching the signature. A
//! missing record is reported as missing whatever proof comes with it; which
//! content addresses exist is public anyway (`list_by_content_address`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::challenge::ChallengePolicy;
use crate::crypto::{IdentityRecoverer, Secp256k1Recoverer};
use crate::error::AccessError;
use crate::identity::{Address, IdentityProof};
use crate::registry::{ContentRecord, ContentRecordRegistry, NewContentRecord};
use crate::validation::{validate_content_address, validate_display_name, validate_proof};

/// Outcome of an access check.
///
/// `record` is present if and only if access was granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub record: Option<ContentRecord>,
}

impl AccessDecision {
    pub fn granted(record: ContentRecord) -> Self {
        Self {
            granted: true,
            record: Some(record),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            record: None,
        }
    }

    /// Turn a denial into [`AccessError::AccessDenied`].
    pub fn into_result(self, content_address: &str) -> Result<ContentRecord, AccessError> {
        match self.record {
            Some(record) if self.granted => Ok(record),
            _ => Err(AccessError::AccessDenied {
                content_address: content_address.to_string(),
            }),
        }
    }
}

/// Registers content and gates access to it by wallet ownership.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request handler.
#[derive(Clone)]
pub struct AccessController {
    registry: Arc<dyn ContentRecordRegistry>,
    recoverer: Arc<dyn IdentityRecoverer>,
    policy: ChallengePolicy,
}

impl AccessController {
    /// Controller with the secp256k1 recoverer and freshness checks off.
    pub fn new(registry: Arc<dyn ContentRecordRegistry>) -> Self {
        Self {
            registry,
            recoverer: Arc::new(Secp256k1Recoverer),
            policy: ChallengePolicy::default(),
        }
    }

    pub fn with_recoverer(mut self, recoverer: Arc<dyn IdentityRecoverer>) -> Self {
        self.recoverer = recoverer;
        self
    }

    pub fn with_policy(mut self, policy: ChallengePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<dyn ContentRecordRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &ChallengePolicy {
        &self.policy
    }

    /// Record `content_address` as owned by whoever signed `proof`.
    ///
    /// The owner is the recovered address, in canonical lowercase, no matter
    /// how the claimed identity was spelled.
    pub fn register_content(
        &self,
        display_name: &str,
        content_address: &str,
        unit_count: u64,
        proof: &IdentityProof,
    ) -> Result<ContentRecord, AccessError> {
        validate_display_name(display_name)?;
        validate_content_address(content_address)?;
        let owner = self.authenticate(proof)?;

        let record = self.registry.create(NewContentRecord {
            display_name: display_name.to_string(),
            content_address: content_address.to_string(),
            owner_identity: owner,
            proof_message: proof.message.clone(),
            proof_signature: proof.signature.clone(),
            unit_count,
        })?;

        tracing::info!(
            id = %record.id,
            owner = %owner,
            cid = %record.content_address,
            units = unit_count,
            "content registered"
        );
        Ok(record)
    }

    /// Return the record for `content_address` if `proof` shows the caller
    /// owns it.
    ///
    /// A valid proof from a non-owner is not an error: it yields
    /// [`AccessDecision::denied`], which never carries the record.
    pub fn verify_and_fetch(
        &self,
        content_address: &str,
        proof: &IdentityProof,
    ) -> Result<AccessDecision, AccessError> {
        validate_content_address(content_address)?;
        validate_proof(proof)?;

        let record = self
            .registry
            .find_by_content_address(content_address)?
            .ok_or_else(|| AccessError::RecordNotFound(content_address.to_string()))?;

        let caller = self.authenticate(proof)?;

        if record.is_owned_by(&caller) {
            tracing::debug!(caller = %caller, cid = content_address, "access granted");
            Ok(AccessDecision::granted(record))
        } else {
            tracing::info!(
                caller = %caller,
                owner = %record.owner_identity,
                cid = content_address,
                "access denied"
            );
            Ok(AccessDecision::denied())
        }
    }

    /// Validate, recover, compare with the claim, apply the policy.
    fn authenticate(&self, proof: &IdentityProof) -> Result<Address, AccessError> {
        let claimed = validate_proof(proof)?;

        let recovered = self
            .recoverer
            .recover_identity(&proof.message, &proof.signature)
            .map_err(|e| {
                tracing::debug!(claimed = %claimed, error = %e, "signature rejected");
                e
            })?;

        if recovered != claimed {
            tracing::warn!(
                claimed = %claimed,
                recovered = %recovered,
                "proof signed by a different wallet than claimed"
            );
            return Err(AccessError::UnauthorizedSignature { claimed, recovered });
        }

        self.policy.check(&proof.message, &recovered)?;
        Ok(recovered)
    }
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("backend", &self.registry.backend())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
