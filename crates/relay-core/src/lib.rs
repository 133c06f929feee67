//! # relay-core
//!
//! Foundation types shared by the relay crates.
//!
//! - **Identities**: [`ConnectionId`] for subscriber connections
//! - **Messages**: [`InboundMessage`] (validated webhook payload),
//!   [`ConnectionNotice`] (per-subscriber confirmation) and
//!   [`OutboundMessage`] (user-originated message sent to the sink)
//! - **Errors**: [`RelayError`] and [`ValidationError`] via `thiserror`
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;

pub use errors::{RelayError, Result, ValidationError};
pub use ids::ConnectionId;
pub use message::{ConnectionNotice, InboundMessage, OutboundMessage, iso_timestamp};
