//! Subscriber connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_core::ConnectionId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Outbound frame queue feeding one SSE response.
pub type FrameSender = mpsc::Sender<Arc<String>>;

/// Why a write to a subscriber did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's queue is full; it is not keeping up.
    #[error("subscriber queue is full")]
    Full,
    /// The stream is gone (peer disconnected or handle closed).
    #[error("subscriber stream is closed")]
    Closed,
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Writable and present in the registry.
    Active,
    /// Handle closed; no further writes are possible.
    Closed,
}

/// A connected subscriber.
///
/// The frame sender is the only way to reach the client's stream. Closing
/// takes it out, which ends the stream on the receiving side and makes every
/// later [`send`](Self::send) fail with [`DeliveryError::Closed`].
pub struct SubscriberConnection {
    /// Registry identity.
    pub id: ConnectionId,
    tx: Mutex<Option<FrameSender>>,
    /// When this connection was registered.
    pub connected_at: Instant,
    delivered: AtomicU64,
}

impl SubscriberConnection {
    /// Wrap a frame sender.
    pub fn new(id: ConnectionId, tx: FrameSender) -> Self {
        Self {
            id,
            tx: Mutex::new(Some(tx)),
            connected_at: Instant::now(),
            delivered: AtomicU64::new(0),
        }
    }

    /// Queue one frame without waiting.
    pub fn send(&self, frame: Arc<String>) -> Result<(), DeliveryError> {
        let guard = self.tx.lock();
        let tx = guard.as_ref().ok_or(DeliveryError::Closed)?;
        match tx.try_send(frame) {
            Ok(()) => {
                let _ = self.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::Closed),
        }
    }

    /// Close the handle. Returns `true` if this call closed it.
    pub fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        match self.tx.lock().as_ref() {
            Some(tx) if !tx.is_closed() => ConnectionState::Active,
            _ => ConnectionState::Closed,
        }
    }

    /// Frames successfully queued to this subscriber.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for SubscriberConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("delivered", &self.delivered_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(buffer: usize) -> (SubscriberConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (SubscriberConnection::new(ConnectionId::next(), tx), rx)
    }

    #[tokio::test]
    async fn send_message_success() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.send(Arc::new("hello".into())).is_ok());
        let msg = rx.recv().await.unwrap();
        assert_eq!(&*msg, "hello");
        assert_eq!(conn.delivered_count(), 1);
    }

    #[test]
    fn send_to_dropped_receiver_is_closed() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_eq!(conn.send(Arc::new("x".into())), Err(DeliveryError::Closed));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn send_to_full_queue_is_full() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send(Arc::new("1".into())).is_ok());
        assert_eq!(conn.send(Arc::new("2".into())), Err(DeliveryError::Full));
        assert_eq!(conn.delivered_count(), 1);
    }

    #[test]
    fn new_connection_is_active() {
        let (conn, _rx) = make_connection(1);
        assert_eq!(conn.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn close_ends_stream_and_rejects_writes() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.close());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.send(Arc::new("late".into())), Err(DeliveryError::Closed));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.close());
        assert!(!conn.close());
    }

    #[tokio::test]
    async fn queued_frames_survive_close() {
        let (conn, mut rx) = make_connection(4);
        conn.send(Arc::new("before".into())).unwrap();
        let _ = conn.close();
        assert_eq!(rx.recv().await.as_deref().map(String::as_str), Some("before"));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = make_connection(1);
        let a = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > a);
    }
}
