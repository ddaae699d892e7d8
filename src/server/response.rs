//! Response envelope and error mapping.
//!
//! Every body is `{statusCode, data, message, success}`.

use crate::RollcallError;
use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Uniform JSON envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// HTTP status, repeated in the body.
    pub status_code: u16,
    /// Payload, `null` on errors.
    pub data: Option<T>,
    /// Human-readable outcome.
    pub message: String,
    /// `true` for 2xx.
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with a payload.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    /// Any success status with a payload.
    pub fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data: Some(data),
            message: message.into(),
            success: status.is_success(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for RollcallError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status >= 500 {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status, "request rejected");
        }

        ApiResponse::<()> {
            status_code: status,
            data: None,
            message: self.to_string(),
            success: false,
        }
        .into_response()
    }
}

/// JSON body extractor whose rejection uses the envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RollcallError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(RollcallError::InvalidRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2], "fine")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"statusCode": 200, "data": [1, 2], "message": "fine", "success": true})
        );
    }

    #[test]
    fn test_error_status() {
        let response = RollcallError::Conflict("dup".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = RollcallError::OutOfRange {
            distance_m: 1500.0,
            radius_m: 100.0,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
