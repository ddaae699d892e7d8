//! Client for the remote face matching service.
//!
//! Contract: `POST {base}/match {referencePhoto, capturedPhoto} -> {match: bool}`.
//! Any transport failure, timeout, or non-2xx status counts as a failed
//! verification, never as a match.

use crate::client::build_user_agent;
use crate::RollcallError;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchRequest<'a> {
    reference_photo: &'a str,
    captured_photo: &'a str,
}

#[derive(Deserialize)]
struct MatchResponse {
    #[serde(rename = "match")]
    matched: bool,
}

/// Face matching service client.
#[derive(Debug, Clone)]
pub struct MatchClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl MatchClient {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RollcallError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RollcallError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: build_user_agent(),
        })
    }

    /// Ask the service whether the two photos show the same person.
    pub async fn compare(&self, reference_photo: &str, captured_photo: &str) -> Result<bool, RollcallError> {
        let url = format!("{}/match", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(USER_AGENT, &self.user_agent)
            .json(&MatchRequest {
                reference_photo,
                captured_photo,
            })
            .send()
            .await
            .map_err(|e| {
                RollcallError::VerificationFailed(format!("face match request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RollcallError::VerificationFailed(format!(
                "face match service returned {}",
                status.as_u16()
            )));
        }

        let body: MatchResponse = response.json().await.map_err(|e| {
            RollcallError::VerificationFailed(format!("unreadable face match response: {}", e))
        })?;
        Ok(body.matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compare_match_and_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/match")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "referencePhoto": "https://cdn.example/ref.jpg",
                "capturedPhoto": "Y2FwdHVyZWQ="
            })))
            .with_status(200)
            .with_body(r#"{"match": true}"#)
            .create_async()
            .await;

        let client = MatchClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let matched = client
            .compare("https://cdn.example/ref.jpg", "Y2FwdHVyZWQ=")
            .await
            .unwrap();

        assert!(matched);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_compare_non_match() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/match")
            .with_status(200)
            .with_body(r#"{"match": false}"#)
            .create_async()
            .await;

        let client = MatchClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(!client.compare("ref", "cap").await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_server_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/match")
            .with_status(503)
            .create_async()
            .await;

        let client = MatchClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = client.compare("ref", "cap").await;
        assert!(matches!(result, Err(RollcallError::VerificationFailed(_))));
    }

    #[tokio::test]
    async fn test_compare_garbage_body_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/match")
            .with_status(200)
            .with_body("yes")
            .create_async()
            .await;

        let client = MatchClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = client.compare("ref", "cap").await;
        assert!(matches!(result, Err(RollcallError::VerificationFailed(_))));
    }
}
