//! Attendance counting rules for reports.
//!
//! Pending records are listed but only verified records count as present.
//! Records a review finalized to `failed` stay in listings and are counted
//! separately.

use crate::ledger::{AttendanceRecord, AttendanceStatus};
use crate::verification::VerificationOutcome;
use serde::Serialize;

/// Whether a record counts toward attendance totals.
pub fn counts_as_present(record: &AttendanceRecord) -> bool {
    record.status == AttendanceStatus::Present
        && record.verification == VerificationOutcome::Verified
}

/// Per-session attendance totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    /// Verified present records.
    pub present: usize,
    /// Records awaiting review.
    pub pending: usize,
    /// Records a review rejected.
    pub failed: usize,
}

impl RosterSummary {
    /// Tally a session's records.
    pub fn tally(records: &[AttendanceRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            if counts_as_present(record) {
                summary.present += 1;
            } else {
                match record.verification {
                    VerificationOutcome::PendingReview => summary.pending += 1,
                    VerificationOutcome::Failed => summary.failed += 1,
                    VerificationOutcome::Verified => {}
                }
            }
            summary
        })
    }
}
