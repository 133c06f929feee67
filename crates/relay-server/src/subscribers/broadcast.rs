//! Message fan-out to registered subscribers.

use std::sync::Arc;

use metrics::counter;
use relay_core::Result;
use serde::Serialize;
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;
use crate::metrics::{BROADCAST_DELIVERIES_TOTAL, BROADCAST_FAILURES_TOTAL};

/// Delivers frames to every subscriber in the registry.
///
/// Each write is a single non-blocking attempt. A subscriber whose write
/// fails is unregistered and the loop moves on; the failure is logged and
/// never returned to the caller.
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastEngine {
    /// Create an engine over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this engine delivers to.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Serialize `message` once and deliver it to every active subscriber.
    ///
    /// Returns the number of subscribers a write was attempted against,
    /// failed ones included. Errors only if serialization fails, in which
    /// case nothing is written.
    pub fn broadcast<T: Serialize>(&self, message: &T) -> Result<usize> {
        let frame = Arc::new(serde_json::to_string(message)?);
        Ok(self.broadcast_frame(&frame))
    }

    /// Deliver an already-encoded frame. Returns the attempt count.
    pub fn broadcast_frame(&self, frame: &Arc<String>) -> usize {
        let targets = self.registry.snapshot();
        let attempted = targets.len();
        let mut failed = 0usize;

        for (id, conn) in targets {
            match conn.send(Arc::clone(frame)) {
                Ok(()) => counter!(BROADCAST_DELIVERIES_TOTAL).increment(1),
                Err(e) => {
                    failed += 1;
                    counter!(BROADCAST_FAILURES_TOTAL).increment(1);
                    warn!(conn_id = %id, error = %e, "delivery failed, dropping subscriber");
                    let _ = self.registry.unregister(id);
                }
            }
        }

        debug!(recipients = attempted, failed, "broadcast frame");
        attempted
    }
}
