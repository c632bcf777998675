// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledCommand;
use crate::engine::CommandName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Commands that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledCommand>,
    /// In-flight commands whose cancellation was requested by this step.
    pub cancelled: Vec<CommandName>,
    /// Whether this step recorded the run's first failure.
    pub first_failure: bool,
    /// Whether every command has now resolved successfully.
    pub all_complete: bool,
}

impl SchedulerStep {
    pub fn scheduled_names(&self) -> Vec<&str> {
        self.newly_scheduled.iter().map(|c| c.name.as_str()).collect()
    }
}
