//! Wire messages.
//!
//! All types serialize with camelCase keys. Optional inputs receive their
//! defaults when the value is constructed, so a message is complete and
//! immutable by the time anything reads it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::ValidationError;

/// Sender label used when the producer does not name one.
pub const DEFAULT_SENDER: &str = "Bot";

/// Sender label for messages synthesized by the relay itself.
pub const RELAY_SENDER: &str = "Server";

/// Text of a relay-synthesized test message when none is supplied.
pub const DEFAULT_TEST_TEXT: &str = "Test message from the relay";

/// Text of the confirmation sent to a freshly opened subscription.
pub const CONNECTED_TEXT: &str = "Connected to the relay";

/// User identifier attached to forwarded messages when the caller omits one.
pub const DEFAULT_USER_ID: &str = "user-001";

/// Current UTC time as ISO-8601 with millisecond precision (`2026-01-01T00:00:00.000Z`).
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A message accepted from the producer and fanned out to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    message: String,
    from: String,
    timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<Value>,
}

impl InboundMessage {
    /// Build a message, applying defaults for every optional field.
    ///
    /// `text` must contain something other than whitespace.
    pub fn new(
        text: impl Into<String>,
        from: Option<String>,
        timestamp: Option<String>,
        session_id: Option<Value>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "message" });
        }
        Ok(Self {
            message: text,
            from: from
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_SENDER.to_owned()),
            timestamp: timestamp
                .filter(|t| !t.is_empty())
                .unwrap_or_else(iso_timestamp),
            session_id: session_id.filter(|s| !s.is_null()),
        })
    }

    /// Validate an untyped webhook body.
    ///
    /// `message` is required. `from` and `timestamp` are used only when they
    /// are non-empty strings. `sessionId` is passed through untouched.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let obj = payload.as_object().ok_or(ValidationError::NotAnObject)?;
        let text = required_str(obj, "message")?;
        Self::new(
            text,
            optional_str(obj, "from"),
            optional_str(obj, "timestamp"),
            obj.get("sessionId").cloned(),
        )
    }

    /// A message attributed to the relay itself.
    pub fn from_relay(text: Option<&str>) -> Self {
        let text = text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TEST_TEXT);
        Self {
            message: text.to_owned(),
            from: RELAY_SENDER.to_owned(),
            timestamp: iso_timestamp(),
            session_id: None,
        }
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.message
    }

    /// Sender label.
    pub fn sender(&self) -> &str {
        &self.from
    }

    /// Producer-supplied or receipt timestamp.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Opaque session identifier, if the producer sent one.
    pub fn session_id(&self) -> Option<&Value> {
        self.session_id.as_ref()
    }
}

/// Confirmation frame sent to one subscriber right after it connects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionNotice {
    /// Always `"connection"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable greeting.
    pub message: String,
    /// When the subscription was accepted.
    pub timestamp: String,
}

impl ConnectionNotice {
    /// Build a notice stamped with the current time.
    pub fn new() -> Self {
        Self {
            kind: "connection".to_owned(),
            message: CONNECTED_TEXT.to_owned(),
            timestamp: iso_timestamp(),
        }
    }
}

impl Default for ConnectionNotice {
    fn default() -> Self {
        Self::new()
    }
}

/// A user-originated message forwarded to the outbound sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    message: String,
    timestamp: String,
    user_id: String,
    session_id: Value,
}

impl OutboundMessage {
    /// Validate a `/send` body.
    ///
    /// Text is trimmed. `userId` defaults to [`DEFAULT_USER_ID`] and
    /// `sessionId` to a fresh `session-<uuid>`.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let obj = payload.as_object().ok_or(ValidationError::NotAnObject)?;
        let text = required_str(obj, "message")?;
        let session_id = match obj.get("sessionId") {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::String(format!("session-{}", Uuid::now_v7())),
        };
        Ok(Self {
            message: text.trim().to_owned(),
            timestamp: iso_timestamp(),
            user_id: optional_str(obj, "userId").unwrap_or_else(|| DEFAULT_USER_ID.to_owned()),
            session_id,
        })
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.message
    }

    /// Originating user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Session the message belongs to.
    pub fn session_id(&self) -> &Value {
        &self.session_id
    }
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::MissingField { field })
}

fn optional_str(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
