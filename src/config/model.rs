// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, RunnerError};
use crate::plugins::{LogStrategy, Options, WaitStrategy};

/// Raw configuration as read from JSON, before semantic validation.
///
/// ```json
/// {
///   "db":  { "cmd": ["postgres", "-D", "data"], "wait": { "type": "socket", "options": { "port": 5432 } } },
///   "api": { "cmd": "./api", "depends": ["db"], "log": { "type": "file", "options": { "name": "api.log" } } }
/// }
/// ```
///
/// Keys are the *command names*.
#[derive(Debug, Clone, Default)]
pub struct RawConfigFile {
    pub commands: BTreeMap<String, RawCommand>,
}

impl RawConfigFile {
    /// Build from a pre-parsed JSON document.
    ///
    /// The top level must be an object; each value is deserialized on its own
    /// so that structural errors name the offending command.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(RunnerError::Config {
                command: "<root>".to_string(),
                field: "configuration".to_string(),
                message: "must be a JSON object keyed by command name".to_string(),
            });
        };

        let mut commands = BTreeMap::new();
        for (name, entry) in entries {
            let raw: RawCommand = serde_json::from_value(entry)
                .map_err(|e| RunnerError::config(&name, "options", e.to_string()))?;
            commands.insert(name, raw);
        }

        Ok(Self { commands })
    }
}

/// `cmd` accepts either a single string or an argv array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CmdLine {
    Single(String),
    Argv(Vec<String>),
}

impl CmdLine {
    /// Coerce to an argv sequence; a single string becomes a one-element argv.
    pub fn into_argv(self) -> Vec<String> {
        match self {
            CmdLine::Single(s) => vec![s],
            CmdLine::Argv(v) => v,
        }
    }
}

/// `{ "type": ..., "options": {...} }` as found under `wait` and `log`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginDescriptor {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub options: Options,
}

/// One command entry as written in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommand {
    /// The command line. Required.
    #[serde(default)]
    pub cmd: Option<CmdLine>,

    /// Working directory for the process.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Terminate the whole run gracefully when this command exits with 0.
    #[serde(default)]
    pub exit_on_success: bool,

    /// Abort the whole run when this command exits non-zero.
    #[serde(default = "default_abort_on_error")]
    pub abort_on_error: bool,

    /// Names of the commands that must be ready before this one starts.
    #[serde(default)]
    pub depends: Option<Vec<String>>,

    #[serde(default)]
    pub log: Option<PluginDescriptor>,

    #[serde(default)]
    pub wait: Option<PluginDescriptor>,
}

fn default_abort_on_error() -> bool {
    true
}

/// Validated configuration: every command resolved, dependencies checked,
/// graph acyclic, plugins bound to typed strategies.
///
/// Only constructed through validation (see `config::validate`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub commands: BTreeMap<String, CommandSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(commands: BTreeMap<String, CommandSpec>) -> Self {
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Immutable, validated description of one command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    /// Non-empty; `argv[0]` is the executable.
    pub argv: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub depends_on: Vec<String>,
    pub exit_on_success: bool,
    pub abort_on_error: bool,
    pub wait: Option<WaitStrategy>,
    pub log: Option<LogStrategy>,
}
