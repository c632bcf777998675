use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use command_runner::dag::ScheduledCommand;
use command_runner::engine::{ExitOutcome, RuntimeEvent};
use command_runner::errors::{Result, RunnerError};
use command_runner::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// What a fake command does once dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Spawn and become ready; the "process" never exits.
    Ready,
    /// Spawn, become ready, then exit with the given code.
    ReadyThenExit(i32),
    /// Spawn, then exit with the given non-zero code before becoming ready.
    ExitBeforeReady(i32),
    /// Fail to spawn at all.
    SpawnFailure(String),
}

/// A fake executor that:
/// - records which commands were dispatched, in order
/// - immediately emits the `RuntimeEvent`s a real supervisor would send
///   for the configured behaviour (default: ready, then exit 0).
pub struct FakeExecutor {
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    behaviours: HashMap<String, FakeBehaviour>,
    default: FakeBehaviour,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            behaviours: HashMap::new(),
            default: FakeBehaviour::ReadyThenExit(0),
        }
    }

    pub fn with_behaviour(mut self, command: &str, behaviour: FakeBehaviour) -> Self {
        self.behaviours.insert(command.to_string(), behaviour);
        self
    }

    pub fn with_default(mut self, behaviour: FakeBehaviour) -> Self {
        self.default = behaviour;
        self
    }

    fn events_for(&self, name: &str) -> Vec<RuntimeEvent> {
        let command = name.to_string();
        let spawned = RuntimeEvent::CommandSpawned {
            command: command.clone(),
            pid: None,
        };
        let ready = RuntimeEvent::CommandReady {
            command: command.clone(),
        };

        match self.behaviours.get(name).unwrap_or(&self.default) {
            FakeBehaviour::Ready => vec![spawned, ready],
            FakeBehaviour::ReadyThenExit(code) => vec![
                spawned,
                ready,
                RuntimeEvent::CommandExited {
                    command,
                    outcome: ExitOutcome::from_code(Some(*code)),
                },
            ],
            FakeBehaviour::ExitBeforeReady(code) => vec![
                spawned,
                RuntimeEvent::CommandFailed {
                    command: command.clone(),
                    reason: RunnerError::Runtime {
                        command: command.clone(),
                        code: code.to_string(),
                    }
                    .to_string(),
                },
                RuntimeEvent::CommandExited {
                    command,
                    outcome: ExitOutcome::from_code(Some(*code)),
                },
            ],
            FakeBehaviour::SpawnFailure(message) => vec![RuntimeEvent::CommandFailed {
                command: command.clone(),
                reason: RunnerError::Spawn {
                    command,
                    message: message.clone(),
                }
                .to_string(),
            }],
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_commands(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let events: Vec<RuntimeEvent> = commands
            .iter()
            .flat_map(|c| self.events_for(&c.name))
            .collect();

        Box::pin(async move {
            {
                let mut guard = executed.lock().unwrap();
                guard.extend(commands.into_iter().map(|c| c.name));
            }

            for event in events {
                tx.send(event).map_err(|e| anyhow::anyhow!("runtime channel closed: {e}"))?;
            }
            Ok(())
        })
    }
}
