//! HTTP route handlers and their error mapping.
//!
//! | Route                | Handler                           |
//! |----------------------|-----------------------------------|
//! | `POST /webhook`      | [`ingest::webhook_handler`]       |
//! | `POST /test-message` | [`test_message::test_message_handler`] |
//! | `POST /send`         | [`send::send_handler`]            |
//! | unknown              | [`not_found_handler`]             |

pub mod ingest;
pub mod send;
pub mod test_message;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use relay_core::ValidationError;
use serde_json::{Value, json};
use thiserror::Error;

use crate::forward::ForwardError;

/// Endpoints listed in the 404 body.
pub const ENDPOINTS: &[&str] = &[
    "GET /events - SSE endpoint for real-time messages",
    "POST /webhook - Receive messages to broadcast",
    "POST /send - Forward a user message to the outbound sink",
    "POST /test-message - Broadcast a test message",
    "GET /health - Health check",
    "GET /metrics - Prometheus metrics",
];

/// Failure of an HTTP request, rendered as a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body could not be parsed as JSON.
    #[error("invalid JSON body: {0}")]
    InvalidBody(String),
    /// The body parsed but failed validation.
    #[error("{reason}")]
    Validation {
        /// What was wrong.
        reason: ValidationError,
        /// The body as received, echoed back to the caller.
        received: Value,
    },
    /// No outbound sink is configured.
    #[error("forwarding is not configured")]
    ForwardingDisabled,
    /// The outbound sink failed.
    #[error(transparent)]
    Forward(#[from] ForwardError),
    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::ForwardingDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forward(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::InvalidBody(details) => json!({
                "error": "Invalid JSON body",
                "details": details,
            }),
            Self::Validation {
                reason: ValidationError::MissingField { field: "message" },
                received,
            } => json!({
                "error": "Message is required",
                "received": received,
            }),
            Self::Validation { reason, received } => json!({
                "error": reason.to_string(),
                "received": received,
            }),
            Self::ForwardingDisabled => json!({
                "error": "Forwarding is not configured",
            }),
            Self::Forward(e) => json!({
                "error": "Failed to forward message",
                "details": e.to_string(),
            }),
            Self::Internal(details) => json!({
                "error": "Internal server error",
                "details": details,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "availableEndpoints": ENDPOINTS,
        })),
    )
}
