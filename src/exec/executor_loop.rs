// src/exec/executor_loop.rs

//! Main executor loop that owns every supervisor task.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::ScheduledCommand;
use crate::engine::CommandName;
use crate::exec::supervisor::{supervise, SupervisorContext};

/// Spawn the background executor loop.
///
/// Each scheduled command runs under its own supervisor task, and **per
/// command name there will never be more than one process**: a second
/// dispatch of a command that already has a supervisor is ignored.
///
/// Once every sender is dropped the loop stops accepting work, waits for
/// each supervisor to return, and then drops its [`SupervisorContext`]. The
/// returned handle completes at that point.
pub fn spawn_executor(ctx: SupervisorContext) -> (mpsc::Sender<ScheduledCommand>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ScheduledCommand>(32);

    let task = tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<CommandName, JoinHandle<()>> = HashMap::new();

        while let Some(command) = rx.recv().await {
            handle_scheduled_command(command, &mut active, &ctx);
        }

        debug!(supervisors = active.len(), "dispatch closed; joining supervisors");
        for (name, handle) in active {
            if let Err(e) = handle.await {
                warn!(command = %name, error = %e, "supervisor task failed");
            }
        }

        info!("executor loop finished (channel closed)");
    });

    (tx, task)
}

fn handle_scheduled_command(
    command: ScheduledCommand,
    active: &mut HashMap<CommandName, JoinHandle<()>>,
    ctx: &SupervisorContext,
) {
    if active.contains_key(&command.name) {
        warn!(
            command = %command.name,
            "command was already dispatched; ignoring duplicate request"
        );
        return;
    }

    debug!(command = %command.name, "starting supervisor");
    let name = command.name.clone();
    let handle = tokio::spawn(supervise(command, ctx.clone()));
    active.insert(name, handle);
}
