// src/dag/task_info.rs

//! Command metadata and per-command scheduling state.

use std::path::PathBuf;

use crate::config::model::CommandSpec;
use crate::engine::CommandName;
use crate::plugins::{LogStrategy, WaitStrategy};

/// Lifecycle of a command as seen by the scheduler.
///
/// States only ever move forward; `Failed` and `Exited` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandState {
    /// Waiting on dependencies (or never started because the run aborted).
    Pending,
    /// Handed to the executor; no process yet.
    Spawning,
    /// Process is running and no wait is configured.
    Running,
    /// Process is running and its wait strategy has not resolved.
    Waiting,
    /// The command's task resolved; dependents may start.
    Ready,
    Failed,
    Exited,
}

impl CommandState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandState::Failed | CommandState::Exited)
    }

    /// Dispatched and not yet terminal.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            CommandState::Spawning
                | CommandState::Running
                | CommandState::Waiting
                | CommandState::Ready
        )
    }
}

/// Static command information derived from config, plus scheduling state.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub spec: CommandSpec,
    /// Dependencies that have not resolved yet.
    pub remaining: usize,
    pub state: CommandState,
    /// Whether the task resolved successfully. Independent of process exit:
    /// a `done` wait resolves only after the process has exited.
    pub resolved: bool,
}

impl CommandInfo {
    pub fn from_spec(spec: &CommandSpec) -> Self {
        Self {
            spec: spec.clone(),
            remaining: spec.depends_on.len(),
            state: CommandState::Pending,
            resolved: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Move to `next` if that is a forward transition. Returns whether the
    /// state changed.
    pub fn advance(&mut self, next: CommandState) -> bool {
        if self.state.is_terminal() || next <= self.state {
            return false;
        }
        self.state = next;
        true
    }
}

/// Description of a command that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    pub name: CommandName,
    pub argv: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub wait: Option<WaitStrategy>,
    pub log: Option<LogStrategy>,
    pub exit_on_success: bool,
    pub abort_on_error: bool,
}

impl ScheduledCommand {
    pub fn from_spec(spec: &CommandSpec) -> Self {
        Self {
            name: spec.name.clone(),
            argv: spec.argv.clone(),
            working_directory: spec.working_directory.clone(),
            wait: spec.wait.clone(),
            log: spec.log.clone(),
            exit_on_success: spec.exit_on_success,
            abort_on_error: spec.abort_on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> CommandInfo {
        CommandInfo::from_spec(&CommandSpec {
            name: "a".to_string(),
            argv: vec!["true".to_string()],
            working_directory: None,
            depends_on: Vec::new(),
            exit_on_success: false,
            abort_on_error: true,
            wait: None,
            log: None,
        })
    }

    #[test]
    fn state_only_moves_forward() {
        let mut info = info();
        assert!(info.advance(CommandState::Waiting));
        assert!(!info.advance(CommandState::Running));
        assert!(info.advance(CommandState::Exited));
        assert!(!info.advance(CommandState::Failed));
        assert_eq!(info.state, CommandState::Exited);
    }
}
