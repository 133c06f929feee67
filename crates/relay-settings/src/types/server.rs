//! Server network settings.

use serde::{Deserialize, Serialize};

/// Default listening port when neither the file nor `PORT` provide one.
pub const DEFAULT_PORT: u16 = 3001;

/// Listener, CORS and subscriber stream settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Origins allowed by CORS (credentials enabled).
    pub allowed_origins: Vec<String>,
    /// Frames queued per subscriber before it counts as too slow and is dropped.
    pub subscriber_buffer: usize,
    /// Interval between SSE keep-alive comments, in seconds.
    pub keep_alive_secs: u64,
    /// How long shutdown waits for the HTTP server to drain, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            subscriber_buffer: 64,
            keep_alive_secs: 15,
            shutdown_timeout_secs: 10,
        }
    }
}
