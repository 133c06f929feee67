//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle backed by a private recorder, for tests and embedding.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// Subscriptions opened total (counter).
pub const SUBSCRIPTIONS_OPENED_TOTAL: &str = "relay_subscriptions_opened_total";
/// Subscriptions closed total, for any reason (counter).
pub const SUBSCRIPTIONS_CLOSED_TOTAL: &str = "relay_subscriptions_closed_total";
/// Active subscribers (gauge).
pub const SUBSCRIBERS_ACTIVE: &str = "relay_subscribers_active";
/// Inbound messages accepted for broadcast (counter, labels: source).
pub const MESSAGES_INGESTED_TOTAL: &str = "relay_messages_ingested_total";
/// Inbound messages rejected by validation (counter).
pub const MESSAGES_REJECTED_TOTAL: &str = "relay_messages_rejected_total";
/// Frames queued to a subscriber (counter).
pub const BROADCAST_DELIVERIES_TOTAL: &str = "relay_broadcast_deliveries_total";
/// Failed writes that dropped a subscriber (counter).
pub const BROADCAST_FAILURES_TOTAL: &str = "relay_broadcast_failures_total";
/// Outbound forwards (counter, labels: outcome).
pub const FORWARDS_TOTAL: &str = "relay_forwards_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_renders() {
        let handle = detached_handle();
        let output = render(&handle);
        // Empty or valid exposition text, no panic.
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            SUBSCRIPTIONS_OPENED_TOTAL,
            SUBSCRIPTIONS_CLOSED_TOTAL,
            SUBSCRIBERS_ACTIVE,
            MESSAGES_INGESTED_TOTAL,
            MESSAGES_REJECTED_TOTAL,
            BROADCAST_DELIVERIES_TOTAL,
            BROADCAST_FAILURES_TOTAL,
            FORWARDS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
            assert!(name.starts_with("relay_"));
        }
    }
}
