//! # relay-server
//!
//! Axum HTTP + SSE server that fans webhook messages out to subscribers.
//!
//! - Subscriber registry and non-blocking broadcast engine
//! - `GET /events` SSE subscriptions with keep-alive
//! - `POST /webhook` ingestion, `POST /test-message`, `POST /send` forwarding
//! - Health check and Prometheus metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod forward;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod subscribers;

pub use config::ServerConfig;
pub use forward::{ForwardError, HttpSink, OutboundSink, SinkReceipt};
pub use server::{AppState, RelayServer, ServerHandle};
pub use subscribers::{BroadcastEngine, ConnectionRegistry};
