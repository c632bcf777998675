// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production supervisor implementation in [`supervisor`](super::supervisor).
//!
//! - `RealExecutorBackend` is the default implementation used by
//!   `command-runner`. It wraps the executor loop and forwards scheduled
//!   commands over an mpsc channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which commands were dispatched and directly emits `RuntimeEvent`s.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dag::ScheduledCommand;
use crate::errors::Result;

use super::executor_loop::spawn_executor;
use super::supervisor::SupervisorContext;

/// Trait abstracting how scheduled commands are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given commands for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate readiness and exits by emitting `RuntimeEvent`s (tests)
    fn spawn_ready_commands(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledCommand>,
}

impl RealExecutorBackend {
    /// Create a backend whose supervisors share `ctx`.
    ///
    /// This spawns the background executor loop immediately. The returned
    /// handle completes after the backend has been dropped and every
    /// supervisor has returned.
    pub fn new(ctx: SupervisorContext) -> (Self, JoinHandle<()>) {
        let (tx, task) = spawn_executor(ctx);
        (Self { tx }, task)
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_commands(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for command in commands {
                tx.send(command)
                    .await
                    .map_err(|e| anyhow!("executor loop stopped before \"{}\" was dispatched", e.0.name))?;
            }
            Ok(())
        })
    }
}
