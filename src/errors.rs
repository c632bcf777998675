// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Configuration-class errors (`Config`, `UnknownDependency`, `DagCycle`,
//! `UnknownPlugin`) are always produced before any process is spawned.
//! The remaining variants describe failures of a single command while the
//! run is in progress.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: \"{command}\" command {field}: {message}")]
    Config {
        command: String,
        field: String,
        message: String,
    },

    #[error("Configuration error: \"{command}\" command depends on unknown command \"{dependency}\"")]
    UnknownDependency { command: String, dependency: String },

    #[error("Cycle detected in command graph: {0}")]
    DagCycle(String),

    #[error("Configuration error: \"{command}\" command {category} type \"{kind}\" is unknown")]
    UnknownPlugin {
        command: String,
        category: String,
        kind: String,
    },

    #[error("Failed to run \"{command}\" command: {message}")]
    Spawn { command: String, message: String },

    #[error("\"{command}\" command has closed with code {code}")]
    Runtime { command: String, code: String },

    #[error("\"{command}\" command error: {message}")]
    WaitTimeout { command: String, message: String },

    #[error("Failed to stop \"{command}\" command: {message}")]
    Cleanup { command: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunnerError {
    /// Shorthand for a [`RunnerError::Config`] on a command field.
    pub fn config(command: &str, field: &str, message: impl Into<String>) -> Self {
        RunnerError::Config {
            command: command.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RunnerError::Config { .. }
                | RunnerError::UnknownDependency { .. }
                | RunnerError::DagCycle(_)
                | RunnerError::UnknownPlugin { .. }
                | RunnerError::JsonError(_)
        )
    }
}

/// Render an optional exit code the way it is reported to the user.
pub fn describe_exit_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "null (terminated by signal)".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunnerError>;
