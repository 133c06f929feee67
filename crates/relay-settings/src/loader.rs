//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Resolve the settings file path.
///
/// `RELAY_SETTINGS_PATH` wins; otherwise `~/.relay/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = read_env_string("RELAY_SETTINGS_PATH") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".relay").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid merged value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let (settings, rejected) = load_settings_reporting(path)?;
    for r in &rejected {
        r.warn();
    }
    Ok(settings)
}

/// Like [`load_settings_from_path`], but hands back the env values that were
/// ignored instead of logging them.
///
/// Settings are loaded before the tracing subscriber exists, so the binary
/// logs the returned overrides once logging is up.
pub fn load_settings_reporting(path: &Path) -> Result<(RelaySettings, Vec<RejectedOverride>)> {
    let mut settings = read_file_layer(path)?;
    let rejected = apply_overrides(&mut settings, |name| std::env::var(name).ok());
    validate(&settings)?;
    Ok((settings, rejected))
}

/// An environment override that failed to parse or was out of range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    /// Variable name.
    pub key: &'static str,
    /// Raw value as read.
    pub value: String,
}

impl RejectedOverride {
    /// Log this override at `warn`.
    pub fn warn(&self) {
        warn!(key = self.key, value = %self.value, "invalid env var, ignoring");
    }
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn read_file_layer(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides read through `lookup` (normally `std::env::var`).
///
/// `RELAY_PORT` takes precedence over the conventional `PORT`. Values that
/// fail to parse or fall outside their range leave the setting untouched and
/// are returned.
pub fn apply_overrides(
    settings: &mut RelaySettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RejectedOverride> {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut rejected = Vec::new();
    let mut reject = |key: &'static str, value: String| {
        rejected.push(RejectedOverride { key, value });
    };

    // ── Server ──────────────────────────────────────────────────────
    for key in ["PORT", "RELAY_PORT"] {
        if let Some(v) = get(key) {
            match parse_u16_range(&v, 1, 65535) {
                Some(port) => settings.server.port = port,
                None => reject(key, v),
            }
        }
    }
    if let Some(v) = get("RELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = get("RELAY_SUBSCRIBER_BUFFER") {
        match parse_usize_range(&v, 1, 65_536) {
            Some(n) => settings.server.subscriber_buffer = n,
            None => reject("RELAY_SUBSCRIBER_BUFFER", v),
        }
    }

    // ── Forwarding ──────────────────────────────────────────────────
    if let Some(v) = get("RELAY_FORWARD_URL") {
        settings.forward.url = Some(v);
    }
    if let Some(v) = get("RELAY_FORWARD_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(n) => settings.forward.timeout_ms = n,
            None => reject("RELAY_FORWARD_TIMEOUT_MS", v),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = get("RELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = get("RELAY_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => reject("RELAY_LOG_JSON", v),
        }
    }
    rejected
}

/// Reject settings the server cannot run with.
pub fn validate(settings: &RelaySettings) -> Result<()> {
    if settings.server.subscriber_buffer == 0 {
        return Err(SettingsError::InvalidValue(
            "server.subscriberBuffer must be at least 1".into(),
        ));
    }
    if settings.server.keep_alive_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "server.keepAliveSecs must be at least 1".into(),
        ));
    }
    if let Some(url) = &settings.forward.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "forward.url must be an http(s) URL, got {url:?}"
            )));
        }
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 3001, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_file_layer(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.server.port, 3001);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server":{{"port":4555}},"forward":{{"url":"http://sink.local/hook"}}}}"#
        )
        .unwrap();
        let settings = read_file_layer(file.path()).unwrap();
        assert_eq!(settings.server.port, 4555);
        assert_eq!(settings.server.subscriber_buffer, 64);
        assert_eq!(settings.forward.url.as_deref(), Some("http://sink.local/hook"));
    }

    #[test]
    fn invalid_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = read_file_layer(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn port_env_overrides() {
        let mut settings = RelaySettings::default();
        let _ = apply_overrides(&mut settings, lookup_from(&[("PORT", "8080")]));
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn relay_port_beats_port() {
        let mut settings = RelaySettings::default();
        let _ = apply_overrides(
            &mut settings,
            lookup_from(&[("PORT", "8080"), ("RELAY_PORT", "9000")]),
        );
        assert_eq!(settings.server.port, 9000);
    }

    #[test]
    fn invalid_port_ignored_and_reported() {
        let mut settings = RelaySettings::default();
        let rejected =
            apply_overrides(&mut settings, lookup_from(&[("PORT", "0"), ("RELAY_PORT", "abc")]));
        assert_eq!(settings.server.port, 3001);
        assert_eq!(
            rejected,
            vec![
                RejectedOverride { key: "PORT", value: "0".into() },
                RejectedOverride { key: "RELAY_PORT", value: "abc".into() },
            ]
        );
    }

    #[test]
    fn every_unparsable_override_is_reported() {
        let mut settings = RelaySettings::default();
        let rejected = apply_overrides(
            &mut settings,
            lookup_from(&[
                ("RELAY_SUBSCRIBER_BUFFER", "0"),
                ("RELAY_FORWARD_TIMEOUT_MS", "fast"),
                ("RELAY_LOG_JSON", "maybe"),
            ]),
        );
        let keys: Vec<_> = rejected.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            ["RELAY_SUBSCRIBER_BUFFER", "RELAY_FORWARD_TIMEOUT_MS", "RELAY_LOG_JSON"]
        );
        assert_eq!(settings.server.subscriber_buffer, 64);
        assert!(!settings.logging.json);
    }

    #[test]
    fn valid_overrides_report_nothing() {
        let mut settings = RelaySettings::default();
        let rejected = apply_overrides(&mut settings, lookup_from(&[("PORT", "8080")]));
        assert!(rejected.is_empty());
    }

    #[test]
    fn forward_and_logging_overrides() {
        let mut settings = RelaySettings::default();
        let _ = apply_overrides(
            &mut settings,
            lookup_from(&[
                ("RELAY_FORWARD_URL", "https://sink.example/hook"),
                ("RELAY_FORWARD_TIMEOUT_MS", "2500"),
                ("RELAY_LOG_LEVEL", "debug"),
                ("RELAY_LOG_JSON", "yes"),
                ("RELAY_HOST", "127.0.0.1"),
                ("RELAY_SUBSCRIBER_BUFFER", "8"),
            ]),
        );
        assert_eq!(settings.forward.url.as_deref(), Some("https://sink.example/hook"));
        assert_eq!(settings.forward.timeout_ms, 2500);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.subscriber_buffer, 8);
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut settings = RelaySettings::default();
        let _ = apply_overrides(&mut settings, lookup_from(&[("RELAY_HOST", "")]));
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn defaults_validate() {
        assert!(validate(&RelaySettings::default()).is_ok());
    }

    #[test]
    fn zero_buffer_rejected() {
        let mut settings = RelaySettings::default();
        settings.server.subscriber_buffer = 0;
        assert!(matches!(
            validate(&settings),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn non_http_forward_url_rejected() {
        let mut settings = RelaySettings::default();
        settings.forward.url = Some("ftp://nope".into());
        assert!(validate(&settings).is_err());
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("80", 1, 65535), Some(80));
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range("50", 100, 200), None);
        assert_eq!(parse_usize_range("3", 1, 10), Some(3));
    }
}
