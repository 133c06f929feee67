//! Authoritative set of live subscriber connections.
//!
//! Every operation takes the lock once, does no I/O and never awaits while
//! holding it, so callers always observe a whole registry: never one that is
//! halfway through a register or unregister.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use relay_core::ConnectionId;
use tracing::{debug, info};

use super::connection::{FrameSender, SubscriberConnection};
use crate::metrics::{SUBSCRIBERS_ACTIVE, SUBSCRIPTIONS_CLOSED_TOTAL, SUBSCRIPTIONS_OPENED_TOTAL};

/// Registry of subscriber connections keyed by identity.
///
/// There is no capacity limit. In practice each subscriber costs one open
/// socket (bounded by the process file-descriptor limit) plus up to
/// `subscriber_buffer` queued frames.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<SubscriberConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Store a new handle as active and return its identity.
    pub fn register(&self, handle: FrameSender) -> ConnectionId {
        let id = ConnectionId::next();
        let conn = Arc::new(SubscriberConnection::new(id, handle));
        let active = {
            let mut conns = self.connections.write();
            let _ = conns.insert(id, conn);
            conns.len()
        };
        counter!(SUBSCRIPTIONS_OPENED_TOTAL).increment(1);
        gauge!(SUBSCRIBERS_ACTIVE).set(active as f64);
        info!(conn_id = %id, active, "subscriber connected");
        id
    }

    /// Remove `id` and close its handle.
    ///
    /// Idempotent: returns `true` only for the call that actually removed the
    /// entry. Later calls (e.g. a write failure racing a disconnect) are no-ops.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let (removed, active) = {
            let mut conns = self.connections.write();
            (conns.remove(&id), conns.len())
        };
        let Some(conn) = removed else {
            debug!(conn_id = %id, "unregister: not registered");
            return false;
        };
        let _ = conn.close();
        counter!(SUBSCRIPTIONS_CLOSED_TOTAL).increment(1);
        gauge!(SUBSCRIBERS_ACTIVE).set(active as f64);
        info!(
            conn_id = %id,
            active,
            delivered = conn.delivered_count(),
            age_ms = conn.age().as_millis() as u64,
            "subscriber disconnected"
        );
        true
    }

    /// Current active entries, copied under a single lock acquisition.
    ///
    /// Entries unregistered after the snapshot is taken are closed, so writes
    /// through a stale snapshot entry fail instead of reaching the stream.
    pub fn snapshot(&self) -> Vec<(ConnectionId, Arc<SubscriberConnection>)> {
        self.connections
            .read()
            .iter()
            .map(|(id, conn)| (*id, Arc::clone(conn)))
            .collect()
    }

    /// Number of active entries.
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    /// Remove and close every connection. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.connections.write().drain().collect();
        let closed = drained.iter().filter(|(_, conn)| conn.close()).count();
        if !drained.is_empty() {
            counter!(SUBSCRIPTIONS_CLOSED_TOTAL).increment(drained.len() as u64);
        }
        gauge!(SUBSCRIBERS_ACTIVE).set(0.0);
        info!(closed, "closed all subscriber connections");
        closed
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
