//! Route handlers. Each one extracts the caller first, then the body.

use crate::attendance::{ClassRoster, HistoryEntry, MarkAttendanceRequest};
use crate::geo::GeoPoint;
use crate::ledger::AttendanceRecord;
use crate::notify::Announcement;
use crate::policy::access::Caller;
use crate::server::auth::{Student, Teacher};
use crate::server::response::{ApiResponse, JsonBody};
use crate::server::AppState;
use crate::session::{ClassSession, NewSession, SessionPatch};
use crate::RollcallError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type ApiResult<T> = Result<ApiResponse<T>, RollcallError>;

fn parse_session_id(raw: Option<&str>) -> Result<Uuid, RollcallError> {
    let raw = raw
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RollcallError::InvalidRequest("sessionId is required".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|e| RollcallError::InvalidRequest(format!("invalid sessionId: {}", e)))
}

/// Body of `POST /attendance/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartClassBody {
    /// Session to open.
    #[serde(default)]
    pub session_id: Option<String>,
    /// New latitude; must come with `lon`.
    #[serde(default)]
    pub lat: Option<f64>,
    /// New longitude; must come with `lat`.
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Body naming a single session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    /// Session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /users/push-token`.
#[derive(Debug, Deserialize)]
pub struct PushTokenBody {
    /// Device push token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `POST /notices/announce`.
#[derive(Debug, Deserialize)]
pub struct AnnounceBody {
    /// Notification title.
    #[serde(default)]
    pub title: Option<String>,
    /// Notification body.
    #[serde(default)]
    pub body: Option<String>,
}

/// Whether an announcement made it onto the queue.
#[derive(Debug, Serialize)]
pub struct Queued {
    /// `false` if the queue was full.
    pub queued: bool,
}

/// `POST /attendance/start`
pub async fn start_class(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    JsonBody(body): JsonBody<StartClassBody>,
) -> ApiResult<ClassSession> {
    let session_id = parse_session_id(body.session_id.as_deref())?;
    let location = match (body.lat, body.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        (None, None) => None,
        _ => {
            return Err(RollcallError::InvalidRequest(
                "lat and lon must be supplied together".to_string(),
            ))
        }
    };

    let session = state
        .sessions
        .open_session(&caller.user_id, session_id, location)
        .await?;
    Ok(ApiResponse::ok(session, "Class started"))
}

/// `POST /attendance/end`
pub async fn end_class(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    JsonBody(body): JsonBody<SessionRef>,
) -> ApiResult<ClassSession> {
    let session_id = parse_session_id(body.session_id.as_deref())?;
    let session = state.sessions.close_session(&caller.user_id, session_id).await?;
    Ok(ApiResponse::ok(session, "Class ended"))
}

/// `POST /attendance/mark`
pub async fn mark_attendance(
    State(state): State<AppState>,
    Student(caller): Student,
    JsonBody(body): JsonBody<MarkAttendanceRequest>,
) -> ApiResult<AttendanceRecord> {
    let record = state
        .attendance
        .mark_attendance(&caller.user_id, body)
        .await?;
    Ok(ApiResponse::ok(record, "Attendance marked"))
}

/// `GET /attendance/student`
pub async fn student_history(
    State(state): State<AppState>,
    Student(caller): Student,
) -> ApiResult<Vec<HistoryEntry>> {
    let history = state.attendance.student_history(&caller.user_id).await?;
    Ok(ApiResponse::ok(history, "Attendance history fetched"))
}

/// `GET /attendance/class/:session_id`
pub async fn class_roster(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    Path(session_id): Path<String>,
) -> ApiResult<ClassRoster> {
    let session_id = parse_session_id(Some(&session_id))?;
    let roster = state
        .attendance
        .class_roster(&caller.user_id, session_id)
        .await?;
    Ok(ApiResponse::ok(roster, "Class attendance fetched"))
}

/// `POST /schedule/create`
pub async fn create_session(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    JsonBody(body): JsonBody<NewSession>,
) -> ApiResult<ClassSession> {
    let session = state.sessions.create_session(&caller.user_id, body).await?;
    Ok(ApiResponse::with_status(
        StatusCode::CREATED,
        session,
        "Class schedule created successfully",
    ))
}

/// `PUT /schedule/edit/:session_id`
pub async fn update_session(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    Path(session_id): Path<String>,
    JsonBody(patch): JsonBody<SessionPatch>,
) -> ApiResult<ClassSession> {
    let session_id = parse_session_id(Some(&session_id))?;
    let session = state
        .sessions
        .update_session(&caller.user_id, session_id, patch)
        .await?;
    Ok(ApiResponse::ok(session, "Class schedule updated"))
}

/// `DELETE /schedule/delete/:session_id`
pub async fn delete_session(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    Path(session_id): Path<String>,
) -> ApiResult<ClassSession> {
    let session_id = parse_session_id(Some(&session_id))?;
    let session = state
        .sessions
        .delete_session(&caller.user_id, session_id)
        .await?;
    Ok(ApiResponse::ok(session, "Class schedule deleted"))
}

/// `GET /schedule/:session_id`
pub async fn get_session(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
    Path(session_id): Path<String>,
) -> ApiResult<ClassSession> {
    let session_id = parse_session_id(Some(&session_id))?;
    let session = state.sessions.get_session(&caller.user_id, session_id).await?;
    Ok(ApiResponse::ok(session, "Class schedule fetched"))
}

/// `GET /schedule`
pub async fn teacher_sessions(
    State(state): State<AppState>,
    Teacher(caller): Teacher,
) -> ApiResult<Vec<ClassSession>> {
    let sessions = state.sessions.teacher_sessions(&caller.user_id).await?;
    Ok(ApiResponse::ok(sessions, "Class schedules fetched"))
}

/// `GET /schedule/student`
pub async fn cohort_sessions(
    State(state): State<AppState>,
    Student(caller): Student,
) -> ApiResult<Vec<ClassSession>> {
    let sessions = state.sessions.batch_sessions(&caller.user_id).await?;
    Ok(ApiResponse::ok(sessions, "Class schedules fetched"))
}

/// `POST /users/push-token`
pub async fn register_push_token(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<PushTokenBody>,
) -> ApiResult<()> {
    let token = body.token.unwrap_or_default();
    state.tokens.register(&caller.user_id, &token).await?;
    tracing::debug!(user_id = %caller.user_id, "push token registered");
    Ok(ApiResponse::ok((), "Push token saved"))
}

/// `POST /notices/announce`
pub async fn announce(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<AnnounceBody>,
) -> ApiResult<Queued> {
    let title = body.title.unwrap_or_default();
    let text = body.body.unwrap_or_default();
    if title.trim().is_empty() || text.trim().is_empty() {
        return Err(RollcallError::InvalidRequest(
            "title and body are required".to_string(),
        ));
    }

    let queued = state.notifier.notify(Announcement::new(title, text));
    tracing::info!(user_id = %caller.user_id, queued, "announcement submitted");
    Ok(ApiResponse::with_status(
        StatusCode::ACCEPTED,
        Queued { queued },
        if queued {
            "Announcement queued"
        } else {
            "Notification queue full; announcement dropped"
        },
    ))
}
