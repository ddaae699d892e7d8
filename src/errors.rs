//! Rollcall error types.

use thiserror::Error;

/// Errors produced by session, attendance, and notification operations.
#[derive(Debug, Error)]
pub enum RollcallError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed or missing input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller identity or credential is missing.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller role does not permit this operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No such session, student, or record.
    #[error("{0} not found")]
    NotFound(String),

    /// Operation is illegal in the session's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Student is outside the session geofence.
    #[error("Out of range: {distance_m:.0}m from session location (limit {radius_m:.0}m)")]
    OutOfRange {
        /// Measured great-circle distance in meters.
        distance_m: f64,
        /// Configured containment radius in meters.
        radius_m: f64,
    },

    /// Identity verification did not succeed.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Attendance already recorded for this session and student.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// HTTP transport error talking to an external collaborator.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected persistence or provider fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RollcallError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::InvalidState(_) | Self::OutOfRange { .. } => 400,
            Self::Unauthenticated(_) | Self::VerificationFailed(_) => 401,
            Self::Unauthorized(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::ConfigError(_) | Self::Transport(_) | Self::Internal(_) => 500,
        }
    }
}
