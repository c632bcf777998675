// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::dag::{ScheduledCommand, Scheduler};
use crate::engine::core::{RunState, RunStatus};
use crate::engine::{CommandName, ExitOutcome, Failure, ShutdownTrigger};
use crate::errors::{describe_exit_code, RunnerError};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these commands to the executor.
    Dispatch(Vec<ScheduledCommand>),
    /// Hand the run over to the shutdown coordinator.
    Shutdown(ShutdownTrigger),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn new(commands: Vec<CoreCommand>, run: &RunState) -> Self {
        Self {
            commands,
            keep_running: run.status == RunStatus::Running,
        }
    }

    /// Names of every dispatched command in this step.
    pub fn dispatched(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::Dispatch(cmds) => Some(cmds),
                CoreCommand::Shutdown(_) => None,
            })
            .flatten()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// The shutdown trigger requested in this step, if any.
    pub fn shutdown(&self) -> Option<&ShutdownTrigger> {
        self.commands.iter().find_map(|c| match c {
            CoreCommand::Shutdown(trigger) => Some(trigger),
            CoreCommand::Dispatch(_) => None,
        })
    }
}

/// Seed the run with every command that has no dependency.
pub fn handle_start(scheduler: &mut Scheduler, run: &mut RunState) -> CoreStep {
    let mut commands = Vec::new();
    dispatch(run, scheduler.start(), &mut commands);
    CoreStep::new(commands, run)
}

pub fn handle_spawned(
    scheduler: &mut Scheduler,
    run: &mut RunState,
    command: CommandName,
    pid: Option<u32>,
) -> CoreStep {
    debug!(command = %command, pid, "command spawned");
    scheduler.handle_spawned(&command);
    run.live.insert(command);
    CoreStep::new(Vec::new(), run)
}

pub fn handle_ready(scheduler: &mut Scheduler, run: &mut RunState, command: CommandName) -> CoreStep {
    let mut commands = Vec::new();
    let newly_ready = scheduler.handle_ready(&command);
    dispatch(run, newly_ready, &mut commands);
    maybe_finish(scheduler, run, &mut commands);
    CoreStep::new(commands, run)
}

/// A command's task failed: the run aborts with the first failure.
pub fn handle_failed(
    scheduler: &mut Scheduler,
    run: &mut RunState,
    command: CommandName,
    reason: String,
) -> CoreStep {
    let mut commands = Vec::new();
    let step = scheduler.handle_failure(&command, &reason);
    if step.first_failure {
        let failure = Failure::of(&command, reason);
        record_failure(run, &failure);
        request_shutdown(run, ShutdownTrigger::Abort(failure), &mut commands);
    }
    CoreStep::new(commands, run)
}

/// Apply the run-wide exit policy to a process exit.
///
/// - exit 0 with `exit_on_success`: graceful exit of the whole run
/// - non-zero with `abort_on_error`: abort of the whole run
/// - non-zero without `abort_on_error`: nothing run-wide
pub fn handle_exited(
    scheduler: &mut Scheduler,
    run: &mut RunState,
    command: CommandName,
    outcome: ExitOutcome,
) -> CoreStep {
    let mut commands = Vec::new();
    run.live.remove(&command);
    scheduler.handle_exited(&command, outcome);

    let (exit_on_success, abort_on_error) = scheduler
        .info(&command)
        .map(|info| (info.spec.exit_on_success, info.spec.abort_on_error))
        .unwrap_or((false, true));
    let closed = RunnerError::Runtime {
        command: command.clone(),
        code: describe_exit_code(outcome.code()),
    }
    .to_string();

    if outcome.is_success() {
        if exit_on_success {
            request_shutdown(run, ShutdownTrigger::Exit { reason: closed }, &mut commands);
        }
    } else if abort_on_error {
        let failure = Failure::of(&command, closed);
        record_failure(run, &failure);
        request_shutdown(run, ShutdownTrigger::Abort(failure), &mut commands);
    } else {
        info!(command = %command, exit_code = ?outcome.code(), "non-zero exit ignored (abort_on_error = false)");
    }

    maybe_finish(scheduler, run, &mut commands);
    CoreStep::new(commands, run)
}

pub fn handle_shutdown_requested(run: &mut RunState, trigger: ShutdownTrigger) -> CoreStep {
    let mut commands = Vec::new();
    request_shutdown(run, trigger, &mut commands);
    CoreStep::new(commands, run)
}

fn dispatch(run: &RunState, ready: Vec<ScheduledCommand>, commands: &mut Vec<CoreCommand>) {
    if run.status == RunStatus::Running && !ready.is_empty() {
        commands.push(CoreCommand::Dispatch(ready));
    }
}

fn record_failure(run: &mut RunState, failure: &Failure) {
    if run.status == RunStatus::Running && run.failure.is_none() {
        run.failure = Some(failure.clone());
    }
}

/// Only the first request leaves `Running`; later ones are dropped.
fn request_shutdown(run: &mut RunState, trigger: ShutdownTrigger, commands: &mut Vec<CoreCommand>) {
    if run.status != RunStatus::Running {
        debug!(trigger = %trigger, "shutdown already requested; ignoring");
        return;
    }
    info!(trigger = %trigger, "requesting shutdown");
    run.status = RunStatus::Aborting;
    commands.push(CoreCommand::Shutdown(trigger));
}

/// Every task resolved and no process left: the run is over.
fn maybe_finish(scheduler: &Scheduler, run: &mut RunState, commands: &mut Vec<CoreCommand>) {
    if run.status == RunStatus::Running && scheduler.is_complete() && run.live.is_empty() {
        request_shutdown(
            run,
            ShutdownTrigger::Exit {
                reason: "all commands have finished".to_string(),
            },
            commands,
        );
    }
}
