//! Router behavior: caller identity, roles, envelopes, schedule routes.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn missing_identity_is_401() {
    let app = app(&config(NO_PROVIDER));
    let (status, body) = call(&app.router, Method::GET, "/schedule", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn role_mismatch_is_403() {
    let app = app(&config(NO_PROVIDER));

    let (status, _) = call(&app.router, Method::GET, "/schedule", Some(STUDENT), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app.router,
        Method::GET,
        "/attendance/student",
        Some(TEACHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_body_is_400_envelope() {
    let app = app(&config(NO_PROVIDER));
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/schedule/create",
        Some(TEACHER),
        Some(json!({"label": "OS"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn mark_without_location_is_400() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(json!({"sessionId": session_id, "verification": signed_evidence(1, &session_id)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn double_start_is_rejected() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/start",
        Some(TEACHER),
        Some(json!({"sessionId": session_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already started"));
}

#[tokio::test]
async fn half_location_on_start_is_rejected() {
    let app = app(&config(NO_PROVIDER));
    let (_, created) = call(
        &app.router,
        Method::POST,
        "/schedule/create",
        Some(TEACHER),
        Some(json!({
            "label": "Networks",
            "batch": "43",
            "startsAt": "2025-01-15T11:00:00Z",
            "endsAt": "2025-01-15T12:00:00Z",
        })),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/attendance/start",
        Some(TEACHER),
        Some(json!({"sessionId": id, "lat": 10.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_lifecycle() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, body) = call(
        &app.router,
        Method::PUT,
        &format!("/schedule/edit/{}", session_id),
        Some(TEACHER),
        Some(json!({"label": "Operating Systems II", "location": {"lat": 10.001, "lon": 20.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["label"], "Operating Systems II");
    assert_eq!(body["data"]["location"]["lat"], 10.001);

    let (status, body) = call(
        &app.router,
        Method::GET,
        "/schedule/student",
        Some(STUDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app.router,
        Method::GET,
        &format!("/schedule/{}", session_id),
        Some(("teacher-2", "teacher")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app.router,
        Method::DELETE,
        &format!("/schedule/delete/{}", session_id),
        Some(TEACHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app.router, Method::GET, "/schedule", Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn roster_and_history() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(&session_id, 10.0, 20.0, signed_evidence(1, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app.router,
        Method::GET,
        &format!("/attendance/class/{}", session_id),
        Some(TEACHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["present"], 1);
    assert_eq!(body["data"]["records"][0]["studentId"], STUDENT.0);

    let (status, body) = call(
        &app.router,
        Method::GET,
        "/attendance/student",
        Some(STUDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sessionId"], session_id);
    assert_eq!(body["data"][0]["session"]["label"], "Operating Systems");

    let (status, _) = call(
        &app.router,
        Method::GET,
        "/attendance/class/not-a-uuid",
        Some(TEACHER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_push_token_is_400() {
    let app = app(&config(NO_PROVIDER));
    let (status, _) = call(
        &app.router,
        Method::POST,
        "/users/push-token",
        Some(STUDENT),
        Some(json!({"token": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
