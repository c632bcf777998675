// src/exec/supervisor.rs

//! Per-command process supervisor.
//!
//! One supervisor owns one OS process for its whole life:
//! check `cwd`, spawn, register for shutdown, attach the log strategy, run
//! the wait strategy, pump output, and report everything to the observer.
//! Readiness and process exit are tracked independently; the supervisor
//! returns once the command's task has resolved *and* the process is gone.
//! An exit is reported only after the process's output has been delivered
//! to every sink (bounded by [`OUTPUT_DRAIN_GRACE`]).

use std::future::pending;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::ScheduledCommand;
use crate::engine::ExitOutcome;
use crate::errors::{describe_exit_code, Result, RunnerError};
use crate::exec::observer::CommandObserver;
use crate::exec::output::{join_until, OutputRouter, OUTPUT_DRAIN_GRACE};
use crate::exec::parent::ParentOutput;
use crate::exec::registry::{KillRequest, LiveProcesses};
use crate::plugins::wait::WaitFuture;
use crate::plugins::{LogTarget, WaitProbe};
use crate::types::StreamSelection;

/// Everything a supervisor shares with the rest of the run.
#[derive(Clone)]
pub struct SupervisorContext {
    pub observer: Arc<dyn CommandObserver>,
    pub processes: LiveProcesses,
    pub parent: ParentOutput,
}

/// Supervise a single command until it has resolved and exited.
pub async fn supervise(command: ScheduledCommand, ctx: SupervisorContext) {
    let name = command.name.clone();

    let mut child = match check_working_directory(&command).and_then(|()| spawn_child(&command)) {
        Ok(child) => child,
        Err(err) => {
            warn!(command = %name, error = %err, "failed to start command");
            ctx.observer.on_error(&name, err);
            return;
        }
    };

    let pid = child.id();
    info!(command = %name, pid, argv = ?command.argv, "spawned process");

    let Some(mut kill_rx) = ctx.processes.register(&name, pid) else {
        debug!(command = %name, "run is shutting down; killing freshly spawned process");
        if let Err(e) = child.start_kill() {
            warn!(command = %name, error = %e, "failed to kill process");
        }
        return;
    };
    ctx.observer.on_spawn(&name, pid);

    let mut router = OutputRouter::new();
    let mut resolved = false;
    let mut log_writer: Option<JoinHandle<()>> = None;

    if let Some(log) = &command.log {
        match log.attach(&name).await {
            Ok(LogTarget::Parent(selection)) => ctx.parent.route(selection, &mut router),
            Ok(LogTarget::Sink {
                streams,
                sink,
                writer,
            }) => {
                router.add(streams, sink);
                log_writer = writer;
            }
            Err(err) => {
                warn!(command = %name, log = log.kind(), error = %err, "log setup failed");
                resolved = true;
                ctx.observer.on_error(&name, err);
            }
        }
    }

    let (exit_tx, exit_rx) = watch::channel(None);
    let mut readiness: WaitFuture = Box::pin(pending::<Result<()>>());

    if !resolved {
        match command.wait.clone() {
            Some(wait) => {
                let output = wait.needs_output().then(|| {
                    let (tx, rx) = mpsc::unbounded_channel();
                    router.add(StreamSelection::Output, tx);
                    rx
                });
                debug!(command = %name, wait = wait.kind(), "waiting for readiness");
                readiness = wait.into_future(WaitProbe {
                    command: name.clone(),
                    output,
                    exit: exit_rx,
                });
            }
            None => {
                debug!(command = %name, "no wait configured; ready after spawn");
                resolved = true;
                ctx.observer.on_ready(&name);
            }
        }
    }

    let mut pumps = router.spawn_pumps(&name, child.stdout.take(), child.stderr.take());

    let mut exited: Option<ExitOutcome> = None;
    let mut kill_pending = true;

    while !(resolved && exited.is_some()) {
        tokio::select! {
            result = &mut readiness, if !resolved => {
                resolved = true;
                match result {
                    Ok(()) => {
                        info!(command = %name, "command is ready");
                        ctx.observer.on_ready(&name);
                    }
                    Err(err) => {
                        warn!(command = %name, error = %err, "wait failed");
                        ctx.observer.on_error(&name, err);
                    }
                }
            }

            status = child.wait(), if exited.is_none() => {
                let outcome = match status {
                    Ok(status) => ExitOutcome::from_code(status.code()),
                    Err(e) => {
                        warn!(command = %name, error = %e, "failed waiting for process");
                        ExitOutcome::Failed(None)
                    }
                };
                ctx.processes.deregister(&name);
                info!(command = %name, pid, exit_code = ?outcome.code(), "process exited");

                // Pumps first: the log writer only finishes once they drop their sinks.
                let deadline = Instant::now() + OUTPUT_DRAIN_GRACE;
                let mut tasks = std::mem::take(&mut pumps);
                tasks.extend(log_writer.take());
                if join_until(&name, tasks, deadline).await {
                    debug!(command = %name, "output drained");
                }

                exited = Some(outcome);
                exit_tx.send_replace(Some(outcome));

                if !resolved && !outcome.is_success() {
                    resolved = true;
                    ctx.observer.on_error(
                        &name,
                        RunnerError::Runtime {
                            command: name.clone(),
                            code: describe_exit_code(outcome.code()),
                        },
                    );
                }
                ctx.observer.on_exit(&name, outcome);
            }

            request = &mut kill_rx, if kill_pending => {
                kill_pending = false;
                if let Ok(KillRequest { ack }) = request {
                    info!(command = %name, pid, "stopping process");
                    let delivered = child.start_kill().map_err(|e| e.to_string());
                    let _ = ack.send(delivered);
                }
            }
        }
    }

    // A kill request that arrived while the output was draining.
    if kill_pending {
        if let Ok(KillRequest { ack }) = kill_rx.try_recv() {
            let _ = ack.send(Ok(()));
        }
    }

    debug!(command = %name, "supervisor finished");
}

fn check_working_directory(command: &ScheduledCommand) -> Result<()> {
    let Some(cwd) = &command.working_directory else {
        return Ok(());
    };
    match std::fs::metadata(cwd) {
        Err(_) => Err(RunnerError::Spawn {
            command: command.name.clone(),
            message: format!("\"cwd\" not found: {}", cwd.display()),
        }),
        Ok(meta) if !meta.is_dir() => Err(RunnerError::Spawn {
            command: command.name.clone(),
            message: format!("\"cwd\" is not a directory: {}", cwd.display()),
        }),
        Ok(_) => Ok(()),
    }
}

fn spawn_child(command: &ScheduledCommand) -> Result<Child> {
    let Some((program, args)) = command.argv.split_first() else {
        return Err(RunnerError::Spawn {
            command: command.name.clone(),
            message: "empty command line".to_string(),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &command.working_directory {
        cmd.current_dir(cwd);
    }

    cmd.spawn().map_err(|e| RunnerError::Spawn {
        command: command.name.clone(),
        message: e.to_string(),
    })
}
