//! Server configuration.

use relay_settings::{ForwardSettings, ServerSettings};
use serde::{Deserialize, Serialize};

/// Runtime configuration for [`RelayServer`](crate::server::RelayServer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// CORS origins allowed with credentials.
    pub allowed_origins: Vec<String>,
    /// Frames queued per subscriber before it is dropped as too slow.
    pub subscriber_buffer: usize,
    /// SSE keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Graceful shutdown budget in seconds.
    pub shutdown_timeout_secs: u64,
    /// Outbound sink URL for `/send`.
    pub forward_url: Option<String>,
    /// Outbound request timeout in milliseconds.
    pub forward_timeout_ms: u64,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(server: &ServerSettings, forward: &ForwardSettings) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            allowed_origins: server.allowed_origins.clone(),
            subscriber_buffer: server.subscriber_buffer,
            keep_alive_secs: server.keep_alive_secs,
            shutdown_timeout_secs: server.shutdown_timeout_secs,
            forward_url: forward.url.clone(),
            forward_timeout_ms: forward.timeout_ms,
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default(), &ForwardSettings::default())
    }
}
