use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// Failure reported by an outbound provider call.
///
/// `status` carries the upstream HTTP status when a response was received;
/// transport-level failures (connect, timeout, body decode) carry `None` and
/// surface as 500. `details` keeps the upstream response body so handlers can
/// pass it through to the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<StatusCode>,
    pub message: String,
    pub details: Option<Value>,
}

impl UpstreamError {
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        Self {
            status: None,
            message: format!("{context}: request error: {err}"),
            details: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Capture status and body of a non-success response for passthrough.
    pub async fn from_response(context: &str, res: reqwest::Response) -> Self {
        let status = res.status();
        let details = res.json::<Value>().await.ok();
        Self {
            status: Some(status),
            message: format!("{context}: upstream status {status}"),
            details,
        }
    }

    /// The provider's own human-readable error text, wherever it put it.
    pub fn provider_message(&self) -> &str {
        self.details
            .as_ref()
            .and_then(|d| {
                d.get("message")
                    .or_else(|| d.get("description"))
                    .or_else(|| d.get("msg"))
            })
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Unified error type for HTTP responses. Every variant renders the
/// `{error, details?}` JSON body the frontend expects.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A statically-required field is missing; no outbound call was made.
    #[error("{0}")]
    Validation(String),
    /// Caller is not on the allow-list; no mutation was attempted.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// A required provider credential is absent from the environment.
    #[error("Server configuration error")]
    Configuration,
    /// The primary provider failed; its status and body pass through.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Configuration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Server configuration error" })),
            )
                .into_response(),
            ApiError::Upstream(err) => {
                let status = err
                    .status
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let mut body = json!({ "error": err.message });
                if let Some(details) = err.details {
                    body["details"] = details;
                }
                (status, Json(body)).into_response()
            }
        }
    }
}
