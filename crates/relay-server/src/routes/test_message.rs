//! `POST /test-message`: broadcast a message attributed to the relay.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use metrics::counter;
use relay_core::InboundMessage;
use serde_json::{Value, json};
use tracing::{error, info};

use super::ApiError;
use crate::metrics::MESSAGES_INGESTED_TOTAL;
use crate::server::AppState;

/// POST /test-message
///
/// The body is optional. A JSON `message` string in it overrides the default
/// text; anything else is ignored.
pub async fn test_message_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    let text = payload
        .as_ref()
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str);

    let message = InboundMessage::from_relay(text);
    let recipients = state.engine.broadcast(&message).map_err(|e| {
        error!(error = %e, "test broadcast failed");
        ApiError::Internal(e.to_string())
    })?;
    counter!(MESSAGES_INGESTED_TOTAL, "source" => "test").increment(1);
    info!(recipients, "test message sent");

    Ok(Json(json!({
        "success": true,
        "message": "Test message sent",
        "data": message,
    })))
}
