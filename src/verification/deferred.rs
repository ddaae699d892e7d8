//! Deferred strategy: keep the evidence, decide later.

use crate::clock::Clock;
use crate::evidence::{EvidenceRecord, EvidenceStore};
use crate::identity::StudentIdentity;
use crate::ledger::AttendanceRecord;
use crate::verification::{Evidence, IdentityVerifier, VerificationOutcome};
use crate::RollcallError;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Stores submitted evidence for an out-of-band review.
///
/// Evidence is written only for records the ledger accepted, keyed by the
/// record id, so a rejected attempt never reaches the store.
pub struct DeferredVerifier {
    store: EvidenceStore,
    clock: Arc<dyn Clock>,
}

impl DeferredVerifier {
    /// Create a verifier writing into `store`.
    pub fn new(store: EvidenceStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl IdentityVerifier for DeferredVerifier {
    fn name(&self) -> &'static str {
        "deferred"
    }

    async fn verify(
        &self,
        session_id: Uuid,
        identity: &StudentIdentity,
        evidence: &Evidence,
    ) -> Result<VerificationOutcome, RollcallError> {
        tracing::debug!(
            %session_id,
            student_id = %identity.id,
            kind = evidence.kind(),
            "evidence accepted for review"
        );
        Ok(VerificationOutcome::PendingReview)
    }

    async fn retain(
        &self,
        record: &AttendanceRecord,
        evidence: &Evidence,
    ) -> Result<(), RollcallError> {
        let stored = EvidenceRecord::new(
            record.id,
            record.session_id,
            &record.student_id,
            evidence.clone(),
            self.clock.as_ref(),
        )?;
        let key = self.store.save(&stored).await?;
        tracing::info!(
            record_id = %record.id,
            session_id = %record.session_id,
            student_id = %record.student_id,
            evidence_key = %key,
            "evidence stored for review"
        );
        Ok(())
    }
}
