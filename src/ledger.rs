//! Append-only attendance ledger.
//!
//! Records are unique per (session, student). The uniqueness check and the
//! insert happen under one lock, so two concurrent check-ins for the same
//! pair cannot both succeed. The only removal is [`AttendanceLedger::withdraw`],
//! which undoes a pending record whose review evidence could not be stored.

use crate::verification::VerificationOutcome;
use crate::RollcallError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Attendance status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// The student was there.
    #[default]
    Present,
}

/// One student attended one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Record id.
    pub id: Uuid,
    /// Session attended.
    pub session_id: Uuid,
    /// Student who attended.
    pub student_id: String,
    /// Check-in time.
    pub timestamp: DateTime<Utc>,
    /// Attendance status.
    pub status: AttendanceStatus,
    /// Outcome of identity verification.
    pub verification: VerificationOutcome,
}

impl AttendanceRecord {
    /// Create a `present` record stamped at `timestamp`.
    pub fn present(
        session_id: Uuid,
        student_id: &str,
        verification: VerificationOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            student_id: student_id.to_string(),
            timestamp,
            status: AttendanceStatus::Present,
            verification,
        }
    }
}

/// Unique-constraint-capable attendance storage.
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Insert a record; `Conflict` if one already exists for its (session, student).
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RollcallError>;

    /// All records of a student, oldest first.
    async fn by_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, RollcallError>;

    /// All records of a session, oldest first.
    async fn by_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>, RollcallError>;

    /// Move a pending record to its final outcome. Allowed exactly once.
    async fn finalize(
        &self,
        record_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<AttendanceRecord, RollcallError>;

    /// Remove a record that is still pending review.
    ///
    /// # Errors
    /// - `NotFound` - no such record
    /// - `InvalidState` - the record was already finalized
    async fn withdraw(&self, record_id: Uuid) -> Result<(), RollcallError>;
}

#[derive(Debug, Default)]
struct LedgerInner {
    records: HashMap<Uuid, AttendanceRecord>,
    by_pair: HashMap<(Uuid, String), Uuid>,
}

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, keep: F) -> Result<Vec<AttendanceRecord>, RollcallError>
    where
        F: Fn(&AttendanceRecord) -> bool,
    {
        let guard = self.inner.lock().map_err(|_| poisoned())?;
        let mut records: Vec<AttendanceRecord> =
            guard.records.values().filter(|r| keep(r)).cloned().collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }
}

fn poisoned() -> RollcallError {
    RollcallError::Internal("attendance ledger lock poisoned".to_string())
}

#[async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RollcallError> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        let key = (record.session_id, record.student_id.clone());
        if guard.by_pair.contains_key(&key) {
            return Err(RollcallError::Conflict(
                "attendance already marked for this class".to_string(),
            ));
        }
        guard.by_pair.insert(key, record.id);
        guard.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn by_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, RollcallError> {
        self.collect(|r| r.student_id == student_id)
    }

    async fn by_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>, RollcallError> {
        self.collect(|r| r.session_id == session_id)
    }

    async fn finalize(
        &self,
        record_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<AttendanceRecord, RollcallError> {
        if outcome == VerificationOutcome::PendingReview {
            return Err(RollcallError::InvalidRequest(
                "review must finalize to verified or failed".to_string(),
            ));
        }
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        let record = guard
            .records
            .get_mut(&record_id)
            .ok_or_else(|| RollcallError::NotFound("Attendance record".to_string()))?;
        if record.verification != VerificationOutcome::PendingReview {
            return Err(RollcallError::InvalidState(
                "attendance record already finalized".to_string(),
            ));
        }
        record.verification = outcome;
        Ok(record.clone())
    }

    async fn withdraw(&self, record_id: Uuid) -> Result<(), RollcallError> {
        let mut guard = self.inner.lock().map_err(|_| poisoned())?;
        let record = guard
            .records
            .get(&record_id)
            .ok_or_else(|| RollcallError::NotFound("Attendance record".to_string()))?;
        if record.verification != VerificationOutcome::PendingReview {
            return Err(RollcallError::InvalidState(
                "only pending records can be withdrawn".to_string(),
            ));
        }
        let key = (record.session_id, record.student_id.clone());
        guard.records.remove(&record_id);
        guard.by_pair.remove(&key);
        Ok(())
    }
}
