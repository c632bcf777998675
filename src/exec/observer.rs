// src/exec/observer.rs

//! Lifecycle notifications from a supervisor.

use tokio::sync::mpsc;
use tracing::trace;

use crate::engine::{ExitOutcome, RuntimeEvent};
use crate::errors::RunnerError;

/// Receives the lifecycle of every supervised command.
///
/// For a single command: `on_spawn` comes first (unless spawning failed),
/// then at most one of `on_ready` / `on_error` for its task, and `on_exit`
/// once the process is gone. `on_exit` and the task resolution may arrive in
/// either order.
pub trait CommandObserver: Send + Sync {
    fn on_spawn(&self, command: &str, pid: Option<u32>);
    fn on_ready(&self, command: &str);
    fn on_error(&self, command: &str, error: RunnerError);
    fn on_exit(&self, command: &str, outcome: ExitOutcome);
}

/// Production observer: forwards everything into the runtime event channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RuntimeEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<RuntimeEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: RuntimeEvent) {
        if let Err(e) = self.tx.send(event) {
            // The runtime has already stopped listening.
            trace!(event = ?e.0, "dropping runtime event");
        }
    }
}

impl CommandObserver for ChannelObserver {
    fn on_spawn(&self, command: &str, pid: Option<u32>) {
        self.send(RuntimeEvent::CommandSpawned {
            command: command.to_string(),
            pid,
        });
    }

    fn on_ready(&self, command: &str) {
        self.send(RuntimeEvent::CommandReady {
            command: command.to_string(),
        });
    }

    fn on_error(&self, command: &str, error: RunnerError) {
        self.send(RuntimeEvent::CommandFailed {
            command: command.to_string(),
            reason: error.to_string(),
        });
    }

    fn on_exit(&self, command: &str, outcome: ExitOutcome) {
        self.send(RuntimeEvent::CommandExited {
            command: command.to_string(),
            outcome,
        });
    }
}
