//! Shared harness for router-level tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use rollcall::client::http::ExpoClient;
use rollcall::identity::{MemoryDirectory, StudentIdentity};
use rollcall::server::App;
use rollcall::{RollcallConfig, SystemClock};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEACHER: (&str, &str) = ("teacher-1", "teacher");
pub const STUDENT: (&str, &str) = ("stu-1", "student");
pub const OTHER_STUDENT: (&str, &str) = ("stu-2", "student");

/// Unroutable provider address for tests that never reach the provider.
pub const NO_PROVIDER: &str = "http://127.0.0.1:9";

pub fn student_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Signature evidence over a payload naming `session_id`.
pub fn signed_evidence(seed: u8, session_id: &str) -> Value {
    let payload = format!("checkin:{}", session_id);
    let signature = student_key(seed).sign(payload.as_bytes());
    json!({
        "kind": "signature",
        "payload": payload,
        "signature": STANDARD.encode(signature.to_bytes()),
    })
}

pub fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    for (id, seed) in [(STUDENT.0, 1u8), (OTHER_STUDENT.0, 2u8)] {
        directory
            .upsert(StudentIdentity {
                public_key: Some(hex::encode(student_key(seed).verifying_key().to_bytes())),
                reference_photo: Some("https://cdn.example/reference.jpg".to_string()),
                ..StudentIdentity::new(id, "43")
            })
            .unwrap();
    }
    directory
}

pub fn config(push_url: &str) -> RollcallConfig {
    RollcallConfig {
        push_base_url: push_url.to_string(),
        chunk_stagger: Duration::ZERO,
        notify_workers: 1,
        ..RollcallConfig::default()
    }
}

pub fn app(config: &RollcallConfig) -> App {
    let provider = ExpoClient::new(&config.push_base_url, Duration::from_secs(5)).unwrap();
    App::with_parts(
        config,
        Arc::new(directory()),
        Arc::new(provider),
        Arc::new(SystemClock),
    )
    .unwrap()
}

pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    caller: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder.header("x-user-id", id).header("x-user-role", role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Create a session as `TEACHER` and open it at (10.0, 20.0). Returns its id.
pub async fn open_session(router: &Router) -> String {
    let (status, created) = call(
        router,
        Method::POST,
        "/schedule/create",
        Some(TEACHER),
        Some(json!({
            "label": "Operating Systems",
            "batch": "43",
            "startsAt": "2025-01-15T09:00:00Z",
            "endsAt": "2025-01-15T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, opened) = call(
        router,
        Method::POST,
        "/attendance/start",
        Some(TEACHER),
        Some(json!({"sessionId": id, "lat": 10.0, "lon": 20.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(opened["data"]["state"], "open");
    id
}

pub fn mark_body(session_id: &str, lat: f64, lon: f64, verification: Value) -> Value {
    json!({
        "sessionId": session_id,
        "location": {"lat": lat, "lon": lon},
        "verification": verification,
    })
}
