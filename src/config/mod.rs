// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the JSON-backed data model (`model.rs`).
//! - Load a config file from disk or accept a parsed document (`loader.rs`).
//! - Validate commands, dependencies, cycles and plugins (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_raw, ConfigSource};
pub use model::{CmdLine, CommandSpec, ConfigFile, PluginDescriptor, RawCommand, RawConfigFile};
pub use validate::validate_config;
