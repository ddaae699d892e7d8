//! Check-in pipeline and attendance queries.
//!
//! `mark_attendance` runs its gates in a fixed order and stops at the first
//! failure:
//! 1. request shape
//! 2. session exists and is open
//! 3. geofence
//! 4. identity verification (time-bounded)
//! 5. atomic insert, unique per (session, student)
//! 6. review evidence stored for the new record, if the strategy keeps any
//!
//! No record exists unless every earlier gate passed. A rejected attempt
//! never touches stored evidence, and a record whose evidence could not be
//! stored is withdrawn.

use crate::clock::{Clock, SystemClock};
use crate::config::RollcallConfig;
use crate::geo::{check_geofence, GeoPoint};
use crate::identity::IdentityDirectory;
use crate::ledger::{AttendanceLedger, AttendanceRecord};
use crate::manager::SessionManager;
use crate::policy::report::RosterSummary;
use crate::session::ClassSession;
use crate::verification::{verify_with_timeout, Evidence, IdentityVerifier, VerificationOutcome};
use crate::RollcallError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Location as reported by the student's device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportedLocation {
    /// Latitude in degrees.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub lon: Option<f64>,
}

/// A student's check-in request. Every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    /// Session to check into.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Where the student is.
    #[serde(default)]
    pub location: Option<ReportedLocation>,
    /// Identity evidence for the active strategy.
    #[serde(default)]
    pub verification: Option<Evidence>,
}

struct CheckIn {
    session_id: Uuid,
    point: GeoPoint,
    evidence: Evidence,
}

impl MarkAttendanceRequest {
    fn into_check_in(self) -> Result<CheckIn, RollcallError> {
        let missing = || {
            RollcallError::InvalidRequest(
                "sessionId, location and verification are required".to_string(),
            )
        };

        let raw_id = self.session_id.filter(|id| !id.trim().is_empty()).ok_or_else(missing)?;
        let session_id = Uuid::parse_str(raw_id.trim())
            .map_err(|e| RollcallError::InvalidRequest(format!("invalid sessionId: {}", e)))?;

        let point = match self.location {
            Some(ReportedLocation {
                lat: Some(lat),
                lon: Some(lon),
            }) => GeoPoint::new(lat, lon),
            _ => return Err(missing()),
        };

        let evidence = self.verification.ok_or_else(missing)?;
        evidence.validate()?;

        Ok(CheckIn {
            session_id,
            point,
            evidence,
        })
    }
}

/// One line of a student's attendance history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The attendance fact.
    #[serde(flatten)]
    pub record: AttendanceRecord,
    /// The session, unless it has since been deleted.
    pub session: Option<ClassSession>,
}

/// Attendance of one session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoster {
    /// The session.
    pub session: ClassSession,
    /// Records, oldest first.
    pub records: Vec<AttendanceRecord>,
    /// Totals under the reporting policy.
    pub summary: RosterSummary,
}

/// Geofenced, verified attendance.
pub struct AttendanceService {
    sessions: Arc<SessionManager>,
    directory: Arc<dyn IdentityDirectory>,
    verifier: Arc<dyn IdentityVerifier>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    radius_m: f64,
    verification_timeout: Duration,
}

impl AttendanceService {
    /// Create a service using the system clock.
    pub fn new(
        sessions: Arc<SessionManager>,
        directory: Arc<dyn IdentityDirectory>,
        verifier: Arc<dyn IdentityVerifier>,
        ledger: Arc<dyn AttendanceLedger>,
        config: &RollcallConfig,
    ) -> Self {
        Self::with_clock(sessions, directory, verifier, ledger, config, Arc::new(SystemClock))
    }

    /// Create a service with a custom clock.
    pub fn with_clock(
        sessions: Arc<SessionManager>,
        directory: Arc<dyn IdentityDirectory>,
        verifier: Arc<dyn IdentityVerifier>,
        ledger: Arc<dyn AttendanceLedger>,
        config: &RollcallConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            directory,
            verifier,
            ledger,
            clock,
            radius_m: config.geofence_radius_m,
            verification_timeout: config.verification_timeout,
        }
    }

    /// Record that `student_id` attended a session.
    ///
    /// # Errors
    /// - `InvalidRequest` - missing fields, bad id, malformed coordinates or evidence
    /// - `NotFound` - no such session or student
    /// - `InvalidState` - session closed or without a location
    /// - `OutOfRange` - outside the geofence
    /// - `Unauthenticated` / `VerificationFailed` - identity not confirmed
    /// - `Conflict` - already marked for this session
    pub async fn mark_attendance(
        &self,
        student_id: &str,
        request: MarkAttendanceRequest,
    ) -> Result<AttendanceRecord, RollcallError> {
        let CheckIn {
            session_id,
            point,
            evidence,
        } = request.into_check_in()?;

        let session = self.sessions.find(session_id).await?;
        if !session.is_active() {
            return Err(RollcallError::InvalidState("class is not active".to_string()));
        }
        let center = session.location.ok_or_else(|| {
            RollcallError::InvalidState("class has no location set".to_string())
        })?;

        point.validate()?;
        let distance_m = match check_geofence(&center, &point, self.radius_m) {
            Ok(distance_m) => distance_m,
            Err(e) => {
                tracing::info!(%session_id, student_id, error = %e, "check-in outside geofence");
                return Err(e);
            }
        };

        let identity = self
            .directory
            .student(student_id)
            .await?
            .ok_or_else(|| RollcallError::NotFound("Student".to_string()))?;
        let outcome = verify_with_timeout(
            self.verifier.as_ref(),
            session_id,
            &identity,
            &evidence,
            self.verification_timeout,
        )
        .await?;

        let record = self
            .ledger
            .insert(AttendanceRecord::present(
                session_id,
                student_id,
                outcome,
                self.clock.now_utc(),
            ))
            .await?;

        if let Err(e) = self.verifier.retain(&record, &evidence).await {
            tracing::error!(
                record_id = %record.id,
                %session_id,
                student_id,
                error = %e,
                "review evidence not stored; withdrawing record"
            );
            if let Err(undo) = self.ledger.withdraw(record.id).await {
                tracing::error!(record_id = %record.id, error = %undo, "withdraw failed");
            }
            return Err(e);
        }

        tracing::info!(
            %session_id,
            student_id,
            distance_m = distance_m.round() as u64,
            strategy = self.verifier.name(),
            outcome = ?outcome,
            "attendance marked"
        );
        Ok(record)
    }

    /// A student's attendance, oldest first, with each session attached.
    pub async fn student_history(
        &self,
        student_id: &str,
    ) -> Result<Vec<HistoryEntry>, RollcallError> {
        let records = self.ledger.by_student(student_id).await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let session = match self.sessions.find(record.session_id).await {
                Ok(session) => Some(session),
                Err(RollcallError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            entries.push(HistoryEntry { record, session });
        }
        Ok(entries)
    }

    /// Attendance of a session owned by `teacher_id`.
    pub async fn class_roster(
        &self,
        teacher_id: &str,
        session_id: Uuid,
    ) -> Result<ClassRoster, RollcallError> {
        let session = self.sessions.get_session(teacher_id, session_id).await?;
        let records = self.ledger.by_session(session_id).await?;
        let summary = RosterSummary::tally(&records);
        Ok(ClassRoster {
            session,
            records,
            summary,
        })
    }

    /// Apply an external review decision to a pending record.
    pub async fn finalize_review(
        &self,
        record_id: Uuid,
        outcome: VerificationOutcome,
    ) -> Result<AttendanceRecord, RollcallError> {
        let record = self.ledger.finalize(record_id, outcome).await?;
        tracing::info!(record_id = %record.id, outcome = ?outcome, "attendance review finalized");
        Ok(record)
    }
}
