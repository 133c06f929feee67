//! `POST /webhook`: accept one message and broadcast it.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use metrics::counter;
use relay_core::InboundMessage;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::ApiError;
use crate::metrics::{MESSAGES_INGESTED_TOTAL, MESSAGES_REJECTED_TOTAL};
use crate::server::AppState;

/// POST /webhook
///
/// Validation happens before the registry is touched, so a rejected body
/// never reaches any subscriber.
pub async fn webhook_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body.map_err(|e| {
        counter!(MESSAGES_REJECTED_TOTAL).increment(1);
        warn!(error = %e, "webhook body rejected");
        ApiError::InvalidBody(e.body_text())
    })?;

    let message = InboundMessage::from_payload(&payload).map_err(|reason| {
        counter!(MESSAGES_REJECTED_TOTAL).increment(1);
        warn!(%reason, "webhook payload invalid");
        ApiError::Validation {
            reason,
            received: payload.clone(),
        }
    })?;

    info!(from = message.sender(), text = message.text(), "webhook received");

    let recipients = state.engine.broadcast(&message).map_err(|e| {
        error!(error = %e, "broadcast failed");
        ApiError::Internal(e.to_string())
    })?;
    counter!(MESSAGES_INGESTED_TOTAL, "source" => "webhook").increment(1);

    Ok(Json(json!({
        "success": true,
        "message": "Message received and forwarded to subscribers",
        "clientsNotified": recipients,
    })))
}
