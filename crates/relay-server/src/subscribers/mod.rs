//! Subscriber connections, the registry that owns them, and broadcast fan-out.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | One subscriber's frame queue and lifecycle state |
//! | `registry` | Identity → connection map: register, unregister, snapshot |
//! | `broadcast` | Snapshot-then-write fan-out with per-subscriber isolation |
//! | `stream` | `GET /events` SSE endpoint and disconnect cleanup |

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod stream;

pub use broadcast::BroadcastEngine;
pub use connection::{ConnectionState, DeliveryError, FrameSender, SubscriberConnection};
pub use registry::ConnectionRegistry;
