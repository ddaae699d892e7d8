//! Reqwest-based push provider client (Expo push API).

use crate::client::build_user_agent;
use crate::protocol::models::{
    parse_receipts_response, parse_send_response, PushMessage, PushReceipt, PushTicket,
    ReceiptsRequest,
};
use crate::RollcallError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Push delivery provider.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send one provider-sized chunk; tickets come back in message order.
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, RollcallError>;

    /// Fetch receipts for previously issued ticket ids.
    async fn receipts(&self, ids: &[String]) -> Result<HashMap<String, PushReceipt>, RollcallError>;
}

/// Expo push API client.
pub struct ExpoClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl ExpoClient {
    /// Create a client for the provider at `base_url`.
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

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Vec<u8>, RollcallError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| RollcallError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RollcallError::Transport(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(RollcallError::Transport(format!(
                "{} returned {}: {}",
                path,
                status.as_u16(),
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PushProvider for ExpoClient {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, RollcallError> {
        let body = self.post_json("/--/api/v2/push/send", messages).await?;
        let tickets = parse_send_response(&body)?.data;
        if tickets.len() != messages.len() {
            return Err(RollcallError::Transport(format!(
                "provider returned {} tickets for {} messages",
                tickets.len(),
                messages.len()
            )));
        }
        Ok(tickets)
    }

    async fn receipts(&self, ids: &[String]) -> Result<HashMap<String, PushReceipt>, RollcallError> {
        let body = self
            .post_json("/--/api/v2/push/getReceipts", &ReceiptsRequest { ids })
            .await?;
        Ok(parse_receipts_response(&body)?.data)
    }
}
