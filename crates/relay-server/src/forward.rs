//! Outbound forwarding of user-originated messages.
//!
//! `POST /send` hands an [`OutboundMessage`] to an [`OutboundSink`]. The
//! production sink is [`HttpSink`], a `reqwest` JSON POST to the configured
//! URL.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::OutboundMessage;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ServerConfig;

/// Why a forward did not succeed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
    /// The sink was unreachable or the request timed out.
    #[error("request to {target} failed: {reason}")]
    Request {
        /// Sink URL.
        target: String,
        /// Transport error text.
        reason: String,
    },
    /// The sink answered with a non-2xx status.
    #[error("{target} responded with status {status}")]
    Status {
        /// Sink URL.
        target: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Result of a successful forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Where the message went.
    pub target: String,
    /// HTTP status returned by the sink.
    pub status: u16,
}

/// Destination for user-originated messages.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    /// Deliver one message.
    async fn forward(&self, message: &OutboundMessage) -> Result<SinkReceipt, ForwardError>;

    /// Human-readable destination, reported back to the caller.
    fn target(&self) -> &str;
}

/// JSON-over-HTTP sink.
pub struct HttpSink {
    url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl HttpSink {
    /// Build a sink posting to `url` with a per-request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ForwardError::ClientBuild(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Build the sink described by `config`, or `None` when forwarding is off.
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>, ForwardError> {
        config
            .forward_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_millis(config.forward_timeout_ms)))
            .transpose()
    }
}

#[async_trait]
impl OutboundSink for HttpSink {
    async fn forward(&self, message: &OutboundMessage) -> Result<SinkReceipt, ForwardError> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                warn!(target_url = %self.url, error = %e, "forward request failed");
                ForwardError::Request {
                    target: self.url.clone(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target_url = %self.url, status = status.as_u16(), "sink rejected message");
            return Err(ForwardError::Status {
                target: self.url.clone(),
                status: status.as_u16(),
            });
        }

        debug!(target_url = %self.url, status = status.as_u16(), "message forwarded");
        Ok(SinkReceipt {
            target: self.url.clone(),
            status: status.as_u16(),
        })
    }

    fn target(&self) -> &str {
        &self.url
    }
}
