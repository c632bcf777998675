// src/engine/mod.rs

//! Orchestration engine for command-runner.
//!
//! This module ties together:
//! - the dependency-ordered scheduler
//! - the run-wide exit policy (`exit_on_success`, `abort_on_error`)
//! - the main runtime event loop that reacts to:
//!   - spawn / ready / failure / exit reports from supervisors
//!   - termination signals
//! - the shutdown coordinator that kills live processes exactly once
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use crate::errors::describe_exit_code;

/// Canonical command name type used throughout the engine.
pub type CommandName = String;

/// How a command process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit code, or `None` when killed by a signal.
    Failed(Option<i32>),
}

impl ExitOutcome {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ExitOutcome::Success,
            other => ExitOutcome::Failed(other),
        }
    }

    pub fn is_success(self) -> bool {
        self == ExitOutcome::Success
    }

    pub fn code(self) -> Option<i32> {
        match self {
            ExitOutcome::Success => Some(0),
            ExitOutcome::Failed(code) => code,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe_exit_code(self.code()))
    }
}

/// The first recorded failure of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// `None` for failures not tied to a single command.
    pub command: Option<CommandName>,
    pub reason: String,
}

impl Failure {
    pub fn of(command: &str, reason: impl Into<String>) -> Self {
        Self {
            command: Some(command.to_string()),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Events flowing into the runtime from supervisors and signal listeners.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The OS process of a command has been spawned.
    CommandSpawned {
        command: CommandName,
        pid: Option<u32>,
    },
    /// The command's task resolved successfully; dependents may start.
    CommandReady { command: CommandName },
    /// The command's task failed (spawn, log setup, wait, early exit).
    CommandFailed {
        command: CommandName,
        reason: String,
    },
    /// The command's process exited.
    CommandExited {
        command: CommandName,
        outcome: ExitOutcome,
    },
    /// Shutdown requested from outside (e.g. Ctrl-C).
    ShutdownRequested { trigger: ShutdownTrigger },
}

pub mod coordinator;
pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use coordinator::{Coordinator, CoordinatorState, ShutdownTrigger, TerminationSignal};
pub use core::{CoreRuntime, RunStatus};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{RunOutcome, Runtime};
