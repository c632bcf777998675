// src/engine/coordinator.rs

//! Whole-run shutdown coordinator.
//!
//! Constructed once per run, before anything is spawned, around the
//! [`LiveProcesses`] registry. The first trigger wins: it moves the
//! coordinator `Armed -> Aborting`, sends one kill request to every live
//! process, waits a bounded grace period for delivery acknowledgements, and
//! moves to `Exiting` with the run's exit code. Every later trigger is a
//! no-op.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::engine::Failure;
use crate::errors::RunnerError;
use crate::exec::registry::{KillRequest, LiveProcesses};

/// How long cleanup waits for kill acknowledgements.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(1);

/// Termination request received from the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Why the run is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// A command or configuration failure.
    Abort(Failure),
    /// Graceful end: `exit_on_success`, or every command finished.
    Exit { reason: String },
    /// SIGINT / SIGTERM.
    Signal(TerminationSignal),
    /// The runtime itself could not continue.
    Fault { reason: String },
}

impl ShutdownTrigger {
    pub fn is_failure(&self) -> bool {
        matches!(self, ShutdownTrigger::Abort(_) | ShutdownTrigger::Fault { .. })
    }

    pub fn failure(&self) -> Option<Failure> {
        match self {
            ShutdownTrigger::Abort(failure) => Some(failure.clone()),
            ShutdownTrigger::Fault { reason } => Some(Failure {
                command: None,
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Abort(failure) => write!(f, "abort: {failure}"),
            ShutdownTrigger::Exit { reason } => write!(f, "exit: {reason}"),
            ShutdownTrigger::Signal(signal) => write!(f, "signal: {signal}"),
            ShutdownTrigger::Fault { reason } => write!(f, "fault: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Armed,
    Aborting,
    Exiting,
}

#[derive(Debug)]
struct Inner {
    state: CoordinatorState,
    trigger: Option<ShutdownTrigger>,
    exit_code: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    processes: LiveProcesses,
    inner: Arc<Mutex<Inner>>,
    kills_sent: Arc<AtomicUsize>,
    grace: Duration,
}

impl Coordinator {
    pub fn new(processes: LiveProcesses) -> Self {
        Self {
            processes,
            inner: Arc::new(Mutex::new(Inner {
                state: CoordinatorState::Armed,
                trigger: None,
                exit_code: None,
            })),
            kills_sent: Arc::new(AtomicUsize::new(0)),
            grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CoordinatorState {
        self.lock().state
    }

    /// Exit code decided by the first trigger.
    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    pub fn first_trigger(&self) -> Option<ShutdownTrigger> {
        self.lock().trigger.clone()
    }

    /// Number of kill requests handed to live processes so far.
    pub fn kill_requests_sent(&self) -> usize {
        self.kills_sent.load(Ordering::SeqCst)
    }

    /// Begin shutdown. Returns the exit code for the first trigger, `None`
    /// for every later one.
    pub async fn trigger(&self, trigger: ShutdownTrigger) -> Option<i32> {
        let exit_code = {
            let mut inner = self.lock();
            if inner.state != CoordinatorState::Armed {
                debug!(trigger = %trigger, state = ?inner.state, "shutdown already in progress; ignoring trigger");
                return None;
            }
            let code = if trigger.is_failure() { 1 } else { 0 };
            inner.state = CoordinatorState::Aborting;
            inner.exit_code = Some(code);
            inner.trigger = Some(trigger.clone());
            code
        };
        debug!(trigger = %trigger, "coordinator: Armed -> Aborting");

        self.cleanup().await;

        self.lock().state = CoordinatorState::Exiting;
        debug!(trigger = %trigger, exit_code, "coordinator: Aborting -> Exiting");
        Some(exit_code)
    }

    async fn cleanup(&self) {
        let handles = self.processes.take_all();
        if handles.is_empty() {
            debug!("no live processes to stop");
            return;
        }
        info!(count = handles.len(), "stopping all running commands");

        let mut pending = Vec::with_capacity(handles.len());
        for handle in handles {
            let (ack_tx, ack_rx) = oneshot::channel();
            match handle.tx.send(KillRequest { ack: ack_tx }) {
                Ok(()) => {
                    self.kills_sent.fetch_add(1, Ordering::SeqCst);
                    pending.push((handle.command, ack_rx));
                }
                Err(_) => debug!(command = %handle.command, pid = handle.pid, "process already gone"),
            }
        }

        let deadline = Instant::now() + self.grace;
        for (command, ack) in pending {
            let message = match timeout_at(deadline, ack).await {
                Ok(Ok(Ok(()))) => {
                    debug!(command = %command, "kill request delivered");
                    continue;
                }
                Ok(Ok(Err(message))) => message,
                Ok(Err(_)) => "supervisor stopped before acknowledging".to_string(),
                Err(_) => "no acknowledgement within grace period".to_string(),
            };
            let err = RunnerError::Cleanup { command, message };
            warn!(error = %err, "cleanup error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_code_follows_first_trigger() {
        let coordinator = Coordinator::new(LiveProcesses::new());
        assert_eq!(coordinator.state(), CoordinatorState::Armed);

        let code = coordinator
            .trigger(ShutdownTrigger::Signal(TerminationSignal::Interrupt))
            .await;
        assert_eq!(code, Some(0));
        assert_eq!(coordinator.state(), CoordinatorState::Exiting);

        let later = coordinator
            .trigger(ShutdownTrigger::Abort(Failure::of("a", "boom")))
            .await;
        assert_eq!(later, None);
        assert_eq!(coordinator.exit_code(), Some(0));
    }

    #[tokio::test]
    async fn abort_yields_failure_code() {
        let coordinator = Coordinator::new(LiveProcesses::new());
        let code = coordinator
            .trigger(ShutdownTrigger::Abort(Failure::of("a", "boom")))
            .await;
        assert_eq!(code, Some(1));
    }

    #[tokio::test]
    async fn unacknowledged_kill_does_not_block_shutdown() {
        let processes = LiveProcesses::new();
        let _rx = processes.register("stuck", None).unwrap();
        let coordinator =
            Coordinator::new(processes).with_grace(Duration::from_millis(50));

        let code = coordinator
            .trigger(ShutdownTrigger::Exit {
                reason: "done".to_string(),
            })
            .await;
        assert_eq!(code, Some(0));
        assert_eq!(coordinator.kill_requests_sent(), 1);
    }
}
