//! Helpers for reading typed values out of a plugin's `options` object.

use std::time::Duration;

use serde_json::Value;

/// Raw plugin options (`"options": { ... }`).
pub type Options = serde_json::Map<String, Value>;

/// Optional non-negative integer.
pub fn get_u64(opts: &Options, key: &str) -> Result<Option<u64>, String> {
    match opts.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("\"{key}\" option must be a non-negative integer")),
    }
}

/// Optional string.
pub fn get_str<'a>(opts: &'a Options, key: &str) -> Result<Option<&'a str>, String> {
    match opts.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(format!("\"{key}\" option must be a string")),
    }
}

/// Required, non-empty string.
pub fn require_str<'a>(opts: &'a Options, key: &str) -> Result<&'a str, String> {
    match get_str(opts, key)? {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("\"{key}\" option is missing or empty")),
    }
}

/// Millisecond duration where absent or `0` falls back to `default_ms`.
pub fn millis_or(opts: &Options, key: &str, default_ms: u64) -> Result<Duration, String> {
    let ms = match get_u64(opts, key)? {
        None | Some(0) => default_ms,
        Some(ms) => ms,
    };
    Ok(Duration::from_millis(ms))
}
