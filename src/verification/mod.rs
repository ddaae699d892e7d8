//! Identity verification behind a single capability interface.
//!
//! One strategy is active per deployment, chosen by
//! [`VerificationStrategy`](crate::config::VerificationStrategy):
//! - [`SignatureVerifier`] checks an Ed25519 signature against the student's key
//! - [`FaceMatchVerifier`] asks a remote service to compare photos
//! - [`DeferredVerifier`] stores the evidence and leaves the outcome pending
//!
//! Callers go through [`verify_with_timeout`], which turns a timed-out
//! strategy into `VerificationFailed` rather than a pass. Anything a strategy
//! keeps for later review is written in [`IdentityVerifier::retain`], once the
//! attendance record exists.

pub mod deferred;
pub mod face_match;
pub mod signature;

use crate::clock::Clock;
use crate::config::{RollcallConfig, VerificationStrategy};
use crate::evidence::EvidenceStore;
use crate::identity::StudentIdentity;
use crate::ledger::AttendanceRecord;
use crate::RollcallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use deferred::DeferredVerifier;
pub use face_match::FaceMatchVerifier;
pub use signature::SignatureVerifier;

/// Result of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Identity confirmed synchronously.
    Verified,
    /// Evidence stored; an external review decides later.
    PendingReview,
    /// Review rejected the evidence.
    Failed,
}

/// Evidence submitted with a check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// A payload signed with the student's registered key.
    Signature {
        /// Signed bytes, as sent.
        payload: String,
        /// Base64 Ed25519 signature.
        signature: String,
    },
    /// A freshly captured photo, base64 or data URL.
    Photo {
        /// Encoded image.
        image: String,
    },
}

impl Evidence {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signature { .. } => "signature",
            Self::Photo { .. } => "photo",
        }
    }

    /// Reject evidence with empty required fields.
    pub fn validate(&self) -> Result<(), RollcallError> {
        let empty = match self {
            Self::Signature { payload, signature } => {
                payload.trim().is_empty() || signature.trim().is_empty()
            }
            Self::Photo { image } => image.trim().is_empty(),
        };
        if empty {
            return Err(RollcallError::InvalidRequest(format!(
                "{} evidence is incomplete",
                self.kind()
            )));
        }
        Ok(())
    }
}

/// A pluggable identity verification strategy.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Verify that `evidence` was produced by `identity` for `session_id`.
    ///
    /// Returns `Verified` or `PendingReview`; a failed check is an error.
    async fn verify(
        &self,
        session_id: Uuid,
        identity: &StudentIdentity,
        evidence: &Evidence,
    ) -> Result<VerificationOutcome, RollcallError>;

    /// Persist what a later review needs for `record`, which the ledger has
    /// just accepted. Strategies that decide synchronously keep nothing.
    async fn retain(
        &self,
        _record: &AttendanceRecord,
        _evidence: &Evidence,
    ) -> Result<(), RollcallError> {
        Ok(())
    }
}

/// Run a verifier with an upper time bound.
///
/// The strategy future is dropped on timeout, so any scratch artifacts it
/// holds are released on that path too.
pub async fn verify_with_timeout(
    verifier: &dyn IdentityVerifier,
    session_id: Uuid,
    identity: &StudentIdentity,
    evidence: &Evidence,
    limit: Duration,
) -> Result<VerificationOutcome, RollcallError> {
    match tokio::time::timeout(limit, verifier.verify(session_id, identity, evidence)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                strategy = verifier.name(),
                student_id = %identity.id,
                timeout_ms = limit.as_millis() as u64,
                "verification timed out"
            );
            Err(RollcallError::VerificationFailed(
                "verification timed out".to_string(),
            ))
        }
    }
}

/// Construct the strategy selected by configuration.
pub fn build_verifier(
    config: &RollcallConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn IdentityVerifier>, RollcallError> {
    let verifier: Arc<dyn IdentityVerifier> = match config.verification {
        VerificationStrategy::Signature => Arc::new(SignatureVerifier::new()),
        VerificationStrategy::FaceMatch => {
            let url = config.face_match_url.as_deref().ok_or_else(|| {
                RollcallError::ConfigError("face_match_url is required".to_string())
            })?;
            Arc::new(FaceMatchVerifier::new(url, config.verification_timeout)?)
        }
        VerificationStrategy::Deferred => {
            let store = EvidenceStore::with_path(config.resolved_evidence_dir()?)?;
            Arc::new(DeferredVerifier::new(store, clock))
        }
    };
    tracing::info!(strategy = verifier.name(), "identity verification configured");
    Ok(verifier)
}
