//! Push provider wire structs (Expo push API).

use crate::RollcallError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error code the provider uses for a permanently dead destination.
pub const DEVICE_NOT_REGISTERED: &str = "DeviceNotRegistered";

/// One outgoing push message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    /// Destination token.
    pub to: String,
    /// Notification sound.
    pub sound: &'static str,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// App payload.
    pub data: PushData,
}

/// App payload attached to each message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    /// Title echoed for the client app.
    pub notice_title: String,
}

impl PushMessage {
    /// Build a message for `to` with the default sound.
    pub fn new(to: &str, title: &str, body: &str) -> Self {
        Self {
            to: to.to_string(),
            sound: "default",
            title: title.to_string(),
            body: body.to_string(),
            data: PushData {
                notice_title: title.to_string(),
            },
        }
    }
}

/// Machine-readable failure details.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushErrorDetails {
    /// Error code, e.g. `DeviceNotRegistered`.
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-message result of a send request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushTicket {
    /// Accepted; a receipt will be available under `id`.
    Ok {
        /// Receipt id.
        id: String,
    },
    /// Rejected at send time.
    Error {
        /// Human-readable message.
        #[serde(default)]
        message: Option<String>,
        /// Failure details.
        #[serde(default)]
        details: Option<PushErrorDetails>,
    },
}

/// Final delivery status for one ticket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushReceipt {
    /// Delivered to the platform push service.
    Ok,
    /// Delivery failed.
    Error {
        /// Human-readable message.
        #[serde(default)]
        message: Option<String>,
        /// Failure details.
        #[serde(default)]
        details: Option<PushErrorDetails>,
    },
}

fn error_code(details: &Option<PushErrorDetails>) -> Option<&str> {
    details.as_ref().and_then(|d| d.error.as_deref())
}

impl PushTicket {
    /// Whether the destination is permanently gone.
    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::Error { details, .. } if error_code(details) == Some(DEVICE_NOT_REGISTERED))
    }
}

impl PushReceipt {
    /// Whether the destination is permanently gone.
    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::Error { details, .. } if error_code(details) == Some(DEVICE_NOT_REGISTERED))
    }
}

/// Response envelope for `push/send`.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    /// One ticket per submitted message, in submission order.
    pub data: Vec<PushTicket>,
}

/// Request body for `push/getReceipts`.
#[derive(Debug, Serialize)]
pub struct ReceiptsRequest<'a> {
    /// Ticket ids to query.
    pub ids: &'a [String],
}

/// Response envelope for `push/getReceipts`.
#[derive(Debug, Deserialize)]
pub struct ReceiptsResponse {
    /// Receipts keyed by ticket id. Unknown ids are omitted.
    pub data: HashMap<String, PushReceipt>,
}

/// Parse a `push/send` response body.
pub fn parse_send_response(body: &[u8]) -> Result<SendResponse, RollcallError> {
    serde_json::from_slice(body)
        .map_err(|e| RollcallError::Transport(format!("Failed to parse push tickets: {}", e)))
}

/// Parse a `push/getReceipts` response body.
pub fn parse_receipts_response(body: &[u8]) -> Result<ReceiptsResponse, RollcallError> {
    serde_json::from_slice(body)
        .map_err(|e| RollcallError::Transport(format!("Failed to parse push receipts: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEND_RESPONSE: &str = r#"{
        "data": [
            {"status": "ok", "id": "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"},
            {
                "status": "error",
                "message": "\"ExponentPushToken[zzz]\" is not a registered push notification recipient",
                "details": {"error": "DeviceNotRegistered"}
            }
        ]
    }"#;

    const RECEIPTS_RESPONSE: &str = r#"{
        "data": {
            "r1": {"status": "ok"},
            "r2": {"status": "error", "message": "gone", "details": {"error": "DeviceNotRegistered"}},
            "r3": {"status": "error", "message": "too big", "details": {"error": "MessageTooBig"}}
        }
    }"#;

    #[test]
    fn test_message_serialization() {
        let message = PushMessage::new("ExponentPushToken[abc]", "Class started", "OS is live");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["to"], "ExponentPushToken[abc]");
        assert_eq!(json["sound"], "default");
        assert_eq!(json["data"]["noticeTitle"], "Class started");
    }

    #[test]
    fn test_parse_send_response() {
        let response = parse_send_response(SEND_RESPONSE.as_bytes()).unwrap();
        assert_eq!(response.data.len(), 2);
        assert!(matches!(&response.data[0], PushTicket::Ok { id } if id.starts_with("XXXX")));
        assert!(!response.data[0].is_unregistered());
        assert!(response.data[1].is_unregistered());
    }

    #[test]
    fn test_parse_receipts_response() {
        let response = parse_receipts_response(RECEIPTS_RESPONSE.as_bytes()).unwrap();
        assert_eq!(response.data["r1"], PushReceipt::Ok);
        assert!(response.data["r2"].is_unregistered());
        assert!(!response.data["r3"].is_unregistered());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_send_response(b"not json"),
            Err(RollcallError::Transport(_))
        ));
        assert!(matches!(
            parse_receipts_response(br#"{"data": []}"#),
            Err(RollcallError::Transport(_))
        ));
    }
}
