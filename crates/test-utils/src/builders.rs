use command_runner::config::{ConfigFile, RawConfigFile};
use command_runner::errors::Result;
use serde_json::{json, Map, Value};

/// Builder for a JSON configuration document, to simplify test setup.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    commands: Map<String, Value>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, name: &str, command: CommandBuilder) -> Self {
        self.commands.insert(name.to_string(), command.build());
        self
    }

    /// The raw JSON document, as a user would write it.
    pub fn to_value(&self) -> Value {
        Value::Object(self.commands.clone())
    }

    /// Validate against the built-in plugins.
    pub fn try_build(&self) -> Result<ConfigFile> {
        ConfigFile::try_from(RawConfigFile::from_value(self.to_value())?)
    }

    pub fn build(&self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for one command entry.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    entry: Map<String, Value>,
}

impl CommandBuilder {
    /// A command given as a single executable string.
    pub fn new(cmd: &str) -> Self {
        let mut entry = Map::new();
        entry.insert("cmd".to_string(), json!(cmd));
        Self { entry }
    }

    /// A command given as an argument vector.
    pub fn argv(args: &[&str]) -> Self {
        let mut entry = Map::new();
        entry.insert("cmd".to_string(), json!(args));
        Self { entry }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::argv(&["sh", "-c", script])
    }

    pub fn depends(mut self, dep: &str) -> Self {
        let deps = self
            .entry
            .entry("depends")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = deps {
            list.push(json!(dep));
        }
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.entry.insert("cwd".to_string(), json!(dir));
        self
    }

    pub fn exit_on_success(mut self, val: bool) -> Self {
        self.entry.insert("exit_on_success".to_string(), json!(val));
        self
    }

    pub fn abort_on_error(mut self, val: bool) -> Self {
        self.entry.insert("abort_on_error".to_string(), json!(val));
        self
    }

    pub fn wait(mut self, kind: &str, options: Value) -> Self {
        self.entry
            .insert("wait".to_string(), json!({ "type": kind, "options": options }));
        self
    }

    pub fn log(mut self, kind: &str, options: Value) -> Self {
        self.entry
            .insert("log".to_string(), json!({ "type": kind, "options": options }));
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.entry)
    }
}
