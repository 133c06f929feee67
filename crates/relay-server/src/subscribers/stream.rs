//! `GET /events`: the SSE subscription endpoint.
//!
//! A subscription registers a fresh frame queue, receives one confirmation
//! frame addressed to it alone, then streams whatever the broadcast engine
//! queues. Dropping the response stream (client gone, server shutting down)
//! unregisters the connection.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::{Stream, StreamExt};
use relay_core::{ConnectionId, ConnectionNotice};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use super::registry::ConnectionRegistry;
use crate::server::AppState;

/// Unregisters its connection when dropped.
struct SubscriptionGuard {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let _ = self.registry.unregister(self.id);
    }
}

/// SSE body for one subscriber: its queued frames as `data:` events.
pub struct SubscriptionStream {
    frames: ReceiverStream<Arc<String>>,
    guard: SubscriptionGuard,
}

impl SubscriptionStream {
    /// Queue the confirmation frame, then register the subscriber.
    ///
    /// The notice goes into the fresh queue before the handle is visible to
    /// broadcasts, so it is always the first frame the subscriber sees.
    pub fn open(registry: Arc<ConnectionRegistry>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        match serde_json::to_string(&ConnectionNotice::new()) {
            Ok(json) => {
                if let Err(e) = tx.try_send(Arc::new(json)) {
                    warn!(error = %e, "failed to queue connection notice");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize connection notice"),
        }
        let id = registry.register(tx);

        Self {
            frames: ReceiverStream::new(rx),
            guard: SubscriptionGuard { registry, id },
        }
    }

    /// Identity of this subscription.
    pub fn id(&self) -> ConnectionId {
        self.guard.id
    }
}

impl Stream for SubscriptionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames
            .poll_next_unpin(cx)
            .map(|frame| frame.map(|json| Ok(Event::default().data(json.as_str()))))
    }
}

/// GET /events
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<KeepAliveStream<SubscriptionStream>> {
    let stream = SubscriptionStream::open(
        Arc::clone(state.engine.registry()),
        state.config.subscriber_buffer,
    );
    Sse::new(stream).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(state.config.keep_alive_secs)),
    )
}
