//! `/health` endpoint.

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"OK"` when the server is running.
    pub status: String,
    /// Time of the probe.
    pub timestamp: String,
    /// Active subscriber count.
    pub connected_clients: usize,
    /// Port the relay listens on.
    pub port: u16,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response from live counters.
pub fn health_check(connected_clients: usize, port: u16, uptime_secs: u64) -> HealthResponse {
    HealthResponse {
        status: "OK".into(),
        timestamp: relay_core::iso_timestamp(),
        connected_clients,
        port,
        uptime_secs,
    }
}
