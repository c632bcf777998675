// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`graph`] holds the directed acyclic graph of commands.
//! - [`scheduler`] contains the state machine that decides which commands
//!   are ready to run, and stops dispatching after the first failure.
//! - [`task_info`] provides command metadata and scheduled command types.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{CommandInfo, CommandState, ScheduledCommand};
