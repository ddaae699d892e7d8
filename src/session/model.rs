//! Class session record and its open/closed state machine.

use crate::geo::GeoPoint;
use crate::RollcallError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a session currently accepts check-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Initial state; check-ins are rejected.
    #[default]
    Closed,
    /// Check-ins are accepted.
    Open,
}

impl SessionState {
    /// `Closed -> Open`. Re-opening an open session is rejected.
    pub fn open(self) -> Result<Self, RollcallError> {
        match self {
            Self::Closed => Ok(Self::Open),
            Self::Open => Err(RollcallError::InvalidState("class already started".to_string())),
        }
    }

    /// `Open -> Closed`. Closing a closed session is rejected.
    pub fn close(self) -> Result<Self, RollcallError> {
        match self {
            Self::Open => Ok(Self::Closed),
            Self::Closed => Err(RollcallError::InvalidState("class not active".to_string())),
        }
    }
}

/// A scheduled teaching block that students check into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    /// Session id.
    pub id: Uuid,

    /// Owning teacher.
    pub teacher_id: String,

    /// Human-readable label, e.g. "Operating Systems".
    pub label: String,

    /// Cohort/batch tag of the students expected to attend.
    pub batch: String,

    /// Scheduled start. Informational only.
    pub starts_at: DateTime<Utc>,

    /// Scheduled end. Informational only; nothing auto-closes on it.
    pub ends_at: DateTime<Utc>,

    /// Current classroom location, if declared.
    pub location: Option<GeoPoint>,

    /// Open/closed state.
    pub state: SessionState,

    /// Optimistic concurrency version, bumped by every stored write.
    pub version: u64,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Fields a teacher supplies when scheduling a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    /// Session label.
    pub label: String,
    /// Cohort/batch tag.
    pub batch: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    pub ends_at: DateTime<Utc>,
}

/// Partial update; only supplied fields are merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    /// New label.
    #[serde(default)]
    pub label: Option<String>,
    /// New batch tag.
    #[serde(default)]
    pub batch: Option<String>,
    /// New scheduled start.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// New scheduled end.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// New location; only accepted while the session is open.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl ClassSession {
    /// Build a closed session from a teacher's schedule request.
    pub fn schedule(
        teacher_id: &str,
        new: NewSession,
        now: DateTime<Utc>,
    ) -> Result<Self, RollcallError> {
        let label = new.label.trim();
        let batch = new.batch.trim();
        if label.is_empty() || batch.is_empty() {
            return Err(RollcallError::InvalidRequest(
                "class name and class batch are required".to_string(),
            ));
        }
        check_window(new.starts_at, new.ends_at)?;

        Ok(Self {
            id: Uuid::new_v4(),
            teacher_id: teacher_id.to_string(),
            label: label.to_string(),
            batch: batch.to_string(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            location: None,
            state: SessionState::Closed,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether check-ins are currently accepted.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Open the session, optionally overwriting its location.
    pub fn open(&mut self, location: Option<GeoPoint>, now: DateTime<Utc>) -> Result<(), RollcallError> {
        let next = self.state.open()?;
        if let Some(point) = location {
            point.validate()?;
            self.location = Some(point);
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// Close the session.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), RollcallError> {
        self.state = self.state.close()?;
        self.updated_at = now;
        Ok(())
    }

    /// Merge a partial update. Nothing is changed if any field is rejected.
    pub fn apply(&mut self, patch: SessionPatch, now: DateTime<Utc>) -> Result<(), RollcallError> {
        if let Some(point) = &patch.location {
            if !self.is_active() {
                return Err(RollcallError::InvalidState(
                    "location can only be changed while the class is active".to_string(),
                ));
            }
            point.validate()?;
        }
        let label = match patch.label {
            Some(label) if label.trim().is_empty() => {
                return Err(RollcallError::InvalidRequest("class name cannot be empty".to_string()))
            }
            Some(label) => label.trim().to_string(),
            None => self.label.clone(),
        };
        let batch = match patch.batch {
            Some(batch) if batch.trim().is_empty() => {
                return Err(RollcallError::InvalidRequest("class batch cannot be empty".to_string()))
            }
            Some(batch) => batch.trim().to_string(),
            None => self.batch.clone(),
        };
        let starts_at = patch.starts_at.unwrap_or(self.starts_at);
        let ends_at = patch.ends_at.unwrap_or(self.ends_at);
        check_window(starts_at, ends_at)?;

        self.label = label;
        self.batch = batch;
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        if patch.location.is_some() {
            self.location = patch.location;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn check_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), RollcallError> {
    if ends_at < starts_at {
        return Err(RollcallError::InvalidRequest(
            "end time cannot be before start time".to_string(),
        ));
    }
    Ok(())
}
