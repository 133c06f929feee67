//! # relay-settings
//!
//! Layered configuration for the relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: `~/.relay/settings.json`, or the path in
//!    `RELAY_SETTINGS_PATH` (deep-merged over defaults)
//! 3. **Environment variables**: `PORT`, `RELAY_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    RejectedOverride, deep_merge, load_settings, load_settings_from_path, load_settings_reporting,
    settings_path, validate,
};
pub use types::*;
