// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::ScheduledCommand;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::coordinator::{Coordinator, ShutdownTrigger};
use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, Failure, RuntimeEvent};

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// 0 unless a failure was recorded, 1 otherwise.
    pub exit_code: i32,
    pub failure: Option<Failure>,
}

/// Drives the scheduler in response to `RuntimeEvent`s, delegates command
/// execution to an `ExecutorBackend`, and hands shutdown to the
/// [`Coordinator`].
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    executor: E,
    coordinator: Coordinator,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
        executor: E,
        coordinator: Coordinator,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            coordinator,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the roots.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes commands returned by the core until one of them asks for
    ///   shutdown, then runs the coordinator.
    pub async fn run(mut self) -> Result<RunOutcome> {
        info!("command-runner runtime started");

        let start = self.core.start();
        let mut shutdown = self.execute(start).await;

        let trigger = loop {
            if let Some(trigger) = shutdown.take() {
                break trigger;
            }

            let Some(event) = self.event_rx.recv().await else {
                break ShutdownTrigger::Fault {
                    reason: "runtime event channel closed".to_string(),
                };
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);
            shutdown = self.execute(step).await;
        };

        let exit_code = match self.coordinator.trigger(trigger.clone()).await {
            Some(code) => code,
            None => self.coordinator.exit_code().unwrap_or(1),
        };
        self.core.finish(&trigger);

        info!(exit_code, "runtime exiting");
        Ok(RunOutcome {
            exit_code,
            failure: self.core.failure().cloned(),
        })
    }

    /// Execute the commands of one core step. Returns the shutdown trigger
    /// once the core (or a dispatch failure) asks for one.
    async fn execute(&mut self, step: CoreStep) -> Option<ShutdownTrigger> {
        let mut shutdown = None;
        for command in step.commands {
            match command {
                CoreCommand::Dispatch(commands) => {
                    if let Err(err) = self.spawn_ready(commands).await {
                        error!(error = %err, "failed to dispatch commands");
                        return Some(ShutdownTrigger::Fault {
                            reason: err.to_string(),
                        });
                    }
                }
                CoreCommand::Shutdown(trigger) => shutdown = Some(trigger),
            }
        }

        if shutdown.is_none() && !step.keep_running {
            return Some(ShutdownTrigger::Fault {
                reason: "core stopped without a shutdown trigger".to_string(),
            });
        }
        shutdown
    }

    async fn spawn_ready(&mut self, commands: Vec<ScheduledCommand>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = commands.iter().map(|c| c.name.as_str()).collect();
        debug!(?names, "spawning ready commands");

        self.executor.spawn_ready_commands(commands).await
    }
}
