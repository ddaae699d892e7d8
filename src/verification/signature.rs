//! Signature strategy: the student's device signs a payload with a key
//! whose public half was registered ahead of time.
//!
//! The payload must contain the session id, so a captured signature cannot
//! be replayed against another class. Replays within one class are stopped by
//! the ledger's one-record-per-student rule.

use crate::crypto::verify::{decode_public_key, verify_ed25519};
use crate::identity::StudentIdentity;
use crate::verification::{Evidence, IdentityVerifier, VerificationOutcome};
use crate::RollcallError;
use async_trait::async_trait;
use uuid::Uuid;

/// Verifies Ed25519 signatures against the student's registered key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create the verifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityVerifier for SignatureVerifier {
    fn name(&self) -> &'static str {
        "signature"
    }

    async fn verify(
        &self,
        session_id: Uuid,
        identity: &StudentIdentity,
        evidence: &Evidence,
    ) -> Result<VerificationOutcome, RollcallError> {
        let Evidence::Signature { payload, signature } = evidence else {
            return Err(RollcallError::InvalidRequest(
                "signature evidence is required".to_string(),
            ));
        };

        let public_key = identity.public_key.as_deref().ok_or_else(|| {
            RollcallError::Unauthenticated(
                "biometric public key not set up for this user".to_string(),
            )
        })?;

        if !payload.contains(&session_id.to_string()) {
            tracing::warn!(
                %session_id,
                student_id = %identity.id,
                "signed payload names another class"
            );
            return Err(RollcallError::VerificationFailed(
                "signed payload is not bound to this class".to_string(),
            ));
        }

        let key = decode_public_key(public_key)?;
        if let Err(e) = verify_ed25519(signature, payload.as_bytes(), &key) {
            tracing::warn!(
                %session_id,
                student_id = %identity.id,
                error = %e,
                "signature rejected"
            );
            return Err(e);
        }

        Ok(VerificationOutcome::Verified)
    }
}
