//! End-to-end check-in and fan-out scenarios through the HTTP router.

mod common;

use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::*;
use rollcall::ledger::AttendanceLedger;
use rollcall::{RollcallConfig, VerificationStrategy};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn checkin_inside_geofence_is_recorded_once() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(&session_id, 10.0003, 20.0003, signed_evidence(1, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "present");
    assert_eq!(body["data"]["verification"], "verified");

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(&session_id, 10.0003, 20.0003, signed_evidence(1, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let session = Uuid::parse_str(&session_id).unwrap();
    assert_eq!(app.ledger.by_session(session).await.unwrap().len(), 1);
}

#[tokio::test]
async fn checkin_outside_geofence_is_rejected() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(OTHER_STUDENT),
        Some(mark_body(&session_id, 10.01, 20.01, signed_evidence(2, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Out of range"));
    assert!(app.ledger.by_student(OTHER_STUDENT.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn checkin_on_closed_session_is_invalid_state() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/attendance/end",
        Some(TEACHER),
        Some(json!({"sessionId": session_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(&session_id, 10.0, 20.0, signed_evidence(1, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid state"));
    assert!(app.ledger.by_student(STUDENT.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_signature_creates_no_record() {
    let app = app(&config(NO_PROVIDER));
    let session_id = open_session(&app.router).await;

    // Signed with the other student's key.
    let (status, _) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(&session_id, 10.0, 20.0, signed_evidence(2, &session_id))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.ledger.by_student(STUDENT.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn face_match_rejection_creates_no_record() {
    let mut matcher = mockito::Server::new_async().await;
    let mock = matcher
        .mock("POST", "/match")
        .with_status(200)
        .with_body(r#"{"match": false}"#)
        .expect(1)
        .create_async()
        .await;

    let config = RollcallConfig {
        verification: VerificationStrategy::FaceMatch,
        face_match_url: Some(matcher.url()),
        ..config(NO_PROVIDER)
    };
    let app = app(&config);
    let session_id = open_session(&app.router).await;

    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/attendance/mark",
        Some(STUDENT),
        Some(mark_body(
            &session_id,
            10.0,
            20.0,
            json!({"kind": "photo", "image": STANDARD.encode(png)}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Verification failed"));
    assert!(app.ledger.by_student(STUDENT.0).await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn unregistered_receipt_prunes_token() {
    let mut provider = mockito::Server::new_async().await;
    let send = provider
        .mock("POST", "/--/api/v2/push/send")
        .with_status(200)
        .with_body(r#"{"data":[{"status":"ok","id":"ticket-a"},{"status":"ok","id":"ticket-b"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let receipts = provider
        .mock("POST", "/--/api/v2/push/getReceipts")
        .with_status(200)
        .with_body(
            r#"{"data":{"ticket-a":{"status":"ok"},"ticket-b":{"status":"error","message":"gone","details":{"error":"DeviceNotRegistered"}}}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let rollcall::server::App {
        router,
        workers,
        tokens,
        ..
    } = app(&config(&provider.url()));

    // Registry pages by user id, so user-a's message is first in the chunk.
    for (user, token) in [
        ("user-a", "ExponentPushToken[alive]"),
        ("user-b", "ExponentPushToken[gone]"),
    ] {
        let (status, _) = call(
            &router,
            Method::POST,
            "/users/push-token",
            Some((user, "student")),
            Some(json!({"token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &router,
        Method::POST,
        "/notices/announce",
        Some(("scraper", "service")),
        Some(json!({"title": "New notice", "body": "Exam schedule published"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["queued"], true);

    drop(router);
    workers.join().await;

    send.assert_async().await;
    receipts.assert_async().await;
    assert!(tokens.contains_token("ExponentPushToken[alive]"));
    assert!(!tokens.contains_token("ExponentPushToken[gone]"));
}
