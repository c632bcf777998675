// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledCommand`s to the executor
//! - handing shutdown over to the coordinator
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::BTreeSet;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_exited, handle_failed, handle_ready, handle_shutdown_requested, handle_spawned,
    handle_start, CoreStep,
};
use crate::engine::{CommandName, Failure, RuntimeEvent, ShutdownTrigger};

/// Whole-run status. Moves `Running -> Aborting -> Exited`, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// Shutdown requested; cleanup in progress.
    Aborting,
    Exited,
}

/// Run-wide state next to the scheduler.
#[derive(Debug)]
pub struct RunState {
    pub status: RunStatus,
    pub failure: Option<Failure>,
    /// Commands with a live process.
    pub live: BTreeSet<CommandName>,
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    run: RunState,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            run: RunState {
                status: RunStatus::Running,
                failure: None,
                live: BTreeSet::new(),
            },
        }
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.run.failure.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn live_count(&self) -> usize {
        self.run.live.len()
    }

    /// Dispatch the roots of the graph.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler, &mut self.run)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::CommandSpawned { command, pid } => {
                handle_spawned(&mut self.scheduler, &mut self.run, command, pid)
            }
            RuntimeEvent::CommandReady { command } => {
                handle_ready(&mut self.scheduler, &mut self.run, command)
            }
            RuntimeEvent::CommandFailed { command, reason } => {
                handle_failed(&mut self.scheduler, &mut self.run, command, reason)
            }
            RuntimeEvent::CommandExited { command, outcome } => {
                handle_exited(&mut self.scheduler, &mut self.run, command, outcome)
            }
            RuntimeEvent::ShutdownRequested { trigger } => {
                handle_shutdown_requested(&mut self.run, trigger)
            }
        }
    }

    /// Mark the run as over once the coordinator is done with `trigger`.
    pub fn finish(&mut self, trigger: &ShutdownTrigger) {
        if self.run.failure.is_none() {
            self.run.failure = trigger.failure();
        }
        self.run.status = RunStatus::Exited;
    }
}
