// src/plugins/mod.rs

//! Wait and log plugins.
//!
//! A configuration names plugins by string (`{"type": "socket", ...}`). The
//! [`PluginRegistry`] resolves each descriptor once, during validation, into a
//! typed [`WaitStrategy`] / [`LogStrategy`] with its options already parsed and
//! range-checked. Unknown kinds never reach the supervisor.
//!
//! Built-ins:
//! - wait: `timer`, `socket`, `output`, `done`
//! - log: `file`, `output`, `stdout`, `stderr`
//!
//! Extra kinds can be registered before a configuration is validated.

pub mod log;
pub mod options;
pub mod wait;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::model::PluginDescriptor;
use crate::errors::{Result, RunnerError};

pub use log::{LogHandler, LogStrategy, LogTarget};
pub use options::Options;
pub use wait::{WaitHandler, WaitProbe, WaitStrategy};

/// The two plugin categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCategory {
    Wait,
    Log,
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginCategory::Wait => f.write_str("wait"),
            PluginCategory::Log => f.write_str("log"),
        }
    }
}

/// Builds a wait strategy from its raw options, or explains why it can't.
pub type WaitFactory = Arc<dyn Fn(&Options) -> std::result::Result<WaitStrategy, String> + Send + Sync>;

/// Builds a log strategy from its raw options, or explains why it can't.
pub type LogFactory = Arc<dyn Fn(&Options) -> std::result::Result<LogStrategy, String> + Send + Sync>;

/// Mapping from (category, kind) to a strategy factory.
#[derive(Clone)]
pub struct PluginRegistry {
    wait: HashMap<String, WaitFactory>,
    log: HashMap<String, LogFactory>,
}

impl PluginRegistry {
    /// A registry with no plugins at all.
    pub fn empty() -> Self {
        Self {
            wait: HashMap::new(),
            log: HashMap::new(),
        }
    }

    /// A registry populated with every built-in plugin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register_log("file", log::file::from_options);
        registry.register_log("output", log::parent::output_from_options);
        registry.register_log("stdout", log::parent::stdout_from_options);
        registry.register_log("stderr", log::parent::stderr_from_options);

        registry.register_wait("timer", wait::timer::from_options);
        registry.register_wait("socket", wait::socket::from_options);
        registry.register_wait("output", wait::output::from_options);
        registry.register_wait("done", wait::done::from_options);

        registry
    }

    /// Register (or replace) a wait kind.
    pub fn register_wait<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&Options) -> std::result::Result<WaitStrategy, String> + Send + Sync + 'static,
    {
        self.wait.insert(kind.to_string(), Arc::new(factory));
    }

    /// Register (or replace) a log kind.
    pub fn register_log<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&Options) -> std::result::Result<LogStrategy, String> + Send + Sync + 'static,
    {
        self.log.insert(kind.to_string(), Arc::new(factory));
    }

    /// Registered kind names for a category, sorted.
    pub fn kinds(&self, category: PluginCategory) -> Vec<&str> {
        let mut kinds: Vec<&str> = match category {
            PluginCategory::Wait => self.wait.keys().map(String::as_str).collect(),
            PluginCategory::Log => self.log.keys().map(String::as_str).collect(),
        };
        kinds.sort_unstable();
        kinds
    }

    /// Resolve the `wait` descriptor of `command`.
    pub fn resolve_wait(&self, command: &str, desc: &PluginDescriptor) -> Result<WaitStrategy> {
        let kind = descriptor_kind(command, PluginCategory::Wait, desc)?;
        let factory = self.wait.get(kind).ok_or_else(|| RunnerError::UnknownPlugin {
            command: command.to_string(),
            category: PluginCategory::Wait.to_string(),
            kind: kind.to_string(),
        })?;
        factory(&desc.options)
            .map_err(|message| RunnerError::config(command, &format!("wait \"{kind}\""), message))
    }

    /// Resolve the `log` descriptor of `command`.
    pub fn resolve_log(&self, command: &str, desc: &PluginDescriptor) -> Result<LogStrategy> {
        let kind = descriptor_kind(command, PluginCategory::Log, desc)?;
        let factory = self.log.get(kind).ok_or_else(|| RunnerError::UnknownPlugin {
            command: command.to_string(),
            category: PluginCategory::Log.to_string(),
            kind: kind.to_string(),
        })?;
        factory(&desc.options)
            .map_err(|message| RunnerError::config(command, &format!("log \"{kind}\""), message))
    }
}

fn descriptor_kind<'a>(
    command: &str,
    category: PluginCategory,
    desc: &'a PluginDescriptor,
) -> Result<&'a str> {
    match desc.kind.as_deref() {
        Some(kind) if !kind.is_empty() => Ok(kind),
        _ => Err(RunnerError::config(
            command,
            &format!("options {category}"),
            "type is missing or empty",
        )),
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("wait", &self.kinds(PluginCategory::Wait))
            .field("log", &self.kinds(PluginCategory::Log))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: serde_json::Value) -> PluginDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(
            registry.kinds(PluginCategory::Wait),
            vec!["done", "output", "socket", "timer"]
        );
        assert_eq!(
            registry.kinds(PluginCategory::Log),
            vec!["file", "output", "stderr", "stdout"]
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let registry = PluginRegistry::with_builtins();
        let err = registry
            .resolve_wait("a", &descriptor(json!({ "type": "http" })))
            .unwrap_err();
        assert!(matches!(err, RunnerError::UnknownPlugin { ref kind, .. } if kind == "http"));
    }

    #[test]
    fn missing_type_is_rejected() {
        let registry = PluginRegistry::with_builtins();
        let err = registry
            .resolve_log("a", &descriptor(json!({ "options": {} })))
            .unwrap_err();
        assert!(err.to_string().contains("type is missing or empty"));
    }

    #[test]
    fn registered_kind_can_be_resolved() {
        let mut registry = PluginRegistry::empty();
        registry.register_log("quiet", |_opts| {
            Ok(LogStrategy::Parent(crate::types::StreamSelection::Stderr))
        });
        let strategy = registry
            .resolve_log("a", &descriptor(json!({ "type": "quiet" })))
            .unwrap();
        assert_eq!(strategy.kind(), "stderr");
    }
}
