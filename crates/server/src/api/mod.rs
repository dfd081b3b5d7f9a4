//! HTTP API handlers.
//!
//! Failures use one JSON shape:
//! `{"status": "error", "errorType": "bad_data" | "internal", "error": "..."}`.
//! Bad input maps to 400, everything else to 500.

pub mod doc;
pub mod receivers;
pub mod routes;
pub mod status;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use utoipa::ToSchema;

pub use receivers::test_receiver;
pub use routes::{add_route, delete_route, edit_route};
pub use status::{health, reload, status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    BadData,
    Internal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[schema(value_type = String)]
    pub status: &'static str,
    pub error_type: ErrorType,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorType,
    message: String,
}

impl ApiError {
    pub fn bad_data(message: impl Into<String>) -> Self {
        Self { kind: ErrorType::BadData, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { kind: ErrorType::Internal, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self.kind {
            ErrorType::BadData => StatusCode::BAD_REQUEST,
            ErrorType::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            status: "error",
            error_type: self.kind,
            error: self.message,
        };
        (code, Json(body)).into_response()
    }
}

/// Decode a JSON object body into `T`. Arrays and scalars are bad data even
/// when every field of `T` has a default.
pub(crate) fn decode_object<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_data(format!("invalid {what}: {e}")))?;
    if !value.is_object() {
        return Err(ApiError::bad_data(format!("invalid {what}: expected a JSON object")));
    }
    serde_json::from_value(value).map_err(|e| ApiError::bad_data(format!("invalid {what}: {e}")))
}

/// Run blocking coordinator work on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("background task failed: {e}")))
}
