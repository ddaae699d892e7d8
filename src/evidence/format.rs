//! Evidence record format.
//!
//! A record stores the submitted evidence together with a SHA-256 digest of
//! its canonical JSON. On load the digest is recomputed, so a reviewer never
//! acts on evidence that changed on disk after submission.

use crate::clock::Clock;
use crate::crypto::digest::{format_digest, verify_digest};
use crate::verification::Evidence;
use crate::RollcallError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Evidence behind one pending attendance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    /// Attendance record this evidence backs.
    pub record_id: Uuid,

    /// Session the check-in targeted.
    pub session_id: Uuid,

    /// Student who submitted it.
    pub student_id: String,

    /// The evidence as submitted.
    pub evidence: Evidence,

    /// `sha-256=<base64>` over the canonical evidence JSON.
    pub digest: String,

    /// When the evidence was stored.
    pub captured_at: DateTime<Utc>,
}

impl EvidenceRecord {
    /// Create a record, computing the evidence digest.
    pub fn new(
        record_id: Uuid,
        session_id: Uuid,
        student_id: &str,
        evidence: Evidence,
        clock: &dyn Clock,
    ) -> Result<Self, RollcallError> {
        let canonical = canonical_bytes(&evidence)?;
        Ok(Self {
            record_id,
            session_id,
            student_id: student_id.to_string(),
            digest: format_digest(&canonical),
            evidence,
            captured_at: clock.now_utc(),
        })
    }

    /// Serialize the record to JSON.
    pub fn to_json(&self) -> Result<String, RollcallError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RollcallError::Internal(format!("Failed to serialize evidence: {}", e)))
    }

    /// Deserialize a record from JSON.
    pub fn from_json(json: &str) -> Result<Self, RollcallError> {
        serde_json::from_str(json)
            .map_err(|e| RollcallError::Internal(format!("Failed to deserialize evidence: {}", e)))
    }

    /// Recompute the digest and compare it to the stored one.
    pub fn verify(&self) -> Result<(), RollcallError> {
        verify_digest(&canonical_bytes(&self.evidence)?, &self.digest)
    }
}

fn canonical_bytes(evidence: &Evidence) -> Result<Vec<u8>, RollcallError> {
    serde_json::to_vec(evidence)
        .map_err(|e| RollcallError::Internal(format!("Failed to encode evidence: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn photo_record(clock: &MockClock) -> EvidenceRecord {
        EvidenceRecord::new(
            Uuid::nil(),
            Uuid::nil(),
            "stu-1",
            Evidence::Photo {
                image: "aGVsbG8=".to_string(),
            },
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_record_json_roundtrip_still_verifies() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let record = photo_record(&clock);

        let restored = EvidenceRecord::from_json(&record.to_json().unwrap()).unwrap();
        assert_eq!(restored.student_id, "stu-1");
        assert_eq!(restored.captured_at, clock.now_utc());
        assert!(restored.verify().is_ok());
    }

    #[test]
    fn test_tampered_evidence_detected() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let mut record = photo_record(&clock);
        record.evidence = Evidence::Photo {
            image: "c3dhcHBlZA==".to_string(),
        };
        assert!(matches!(record.verify(), Err(RollcallError::Internal(_))));
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(matches!(
            EvidenceRecord::from_json("not json"),
            Err(RollcallError::Internal(_))
        ));
    }
}
