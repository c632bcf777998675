// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::validate::validate_config;
use crate::errors::Result;
use crate::plugins::PluginRegistry;

/// Where a configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A JSON file on disk.
    Path(PathBuf),
    /// An already-parsed JSON document.
    Value(Value),
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::Path(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::Path(path.to_path_buf())
    }
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        ConfigSource::Value(value)
    }
}

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs JSON deserialization; it does **not** perform semantic
/// validation (dependencies, cycles, plugin options). Use [`load_and_validate`]
/// for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read \"{}\" JSON file", path.display()))?;

    let value: Value = serde_json::from_str(&contents)?;
    RawConfigFile::from_value(value)
}

/// Resolve a [`ConfigSource`] into a raw configuration.
pub fn load_raw(source: ConfigSource) -> Result<RawConfigFile> {
    match source {
        ConfigSource::Path(path) => load_from_path(path),
        ConfigSource::Value(value) => RawConfigFile::from_value(value),
    }
}

/// Load a configuration and validate it against `registry`.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads JSON (or takes a parsed document).
/// - Applies defaults (handled by `serde` attributes).
/// - Checks for missing/empty `cmd`, unknown `depends` references, cycles,
///   and unknown or malformed `wait` / `log` plugins.
pub fn load_and_validate(
    source: impl Into<ConfigSource>,
    registry: &PluginRegistry,
) -> Result<ConfigFile> {
    let raw = load_raw(source.into())?;
    validate_config(raw, registry)
}
