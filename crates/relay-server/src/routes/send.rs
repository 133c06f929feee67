//! `POST /send`: forward a user message to the outbound sink.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use metrics::counter;
use relay_core::OutboundMessage;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::ApiError;
use crate::metrics::FORWARDS_TOTAL;
use crate::server::AppState;

/// POST /send
pub async fn send_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let message = OutboundMessage::from_payload(&payload).map_err(|reason| {
        ApiError::Validation {
            reason,
            received: payload.clone(),
        }
    })?;

    let Some(sink) = state.forwarder.as_ref() else {
        counter!(FORWARDS_TOTAL, "outcome" => "disabled").increment(1);
        warn!("send requested but no outbound sink is configured");
        return Err(ApiError::ForwardingDisabled);
    };

    info!(user_id = message.user_id(), target = sink.target(), "forwarding message");
    match sink.forward(&message).await {
        Ok(receipt) => {
            counter!(FORWARDS_TOTAL, "outcome" => "ok").increment(1);
            Ok(Json(json!({
                "success": true,
                "forwardedTo": receipt.target,
                "status": receipt.status,
            })))
        }
        Err(e) => {
            counter!(FORWARDS_TOTAL, "outcome" => "error").increment(1);
            Err(e.into())
        }
    }
}
