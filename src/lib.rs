// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plugins;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile, ConfigSource};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{
    Coordinator, CoreRuntime, RunOutcome, Runtime, RuntimeEvent, ShutdownTrigger,
    TerminationSignal,
};
use crate::errors::Result;
use crate::exec::{
    ChannelObserver, LiveProcesses, ParentOutput, ParentWriters, RealExecutorBackend,
    SupervisorContext,
};
use crate::plugins::PluginRegistry;

/// How long a finished run waits for outstanding command output.
pub const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// A loaded, validated set of commands ready to run.
///
/// ```no_run
/// # async fn demo() -> command_runner::errors::Result<()> {
/// use command_runner::Runner;
/// use serde_json::json;
///
/// let mut runner = Runner::new();
/// runner.load(json!({
///     "db": { "cmd": ["postgres"], "wait": { "type": "socket", "options": { "port": 5432 } } },
///     "api": { "cmd": "./api", "depends": ["db"], "log": { "type": "output" } }
/// }))?;
/// let outcome = runner.run().await?;
/// std::process::exit(outcome.exit_code);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Runner {
    registry: PluginRegistry,
    config: Option<ConfigFile>,
}

impl Runner {
    /// A runner with every built-in plugin registered.
    pub fn new() -> Self {
        Self::with_registry(PluginRegistry::with_builtins())
    }

    pub fn with_registry(registry: PluginRegistry) -> Self {
        Self {
            registry,
            config: None,
        }
    }

    /// Register extra plugin kinds before calling [`Runner::load`].
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Load and validate a configuration. Nothing is spawned.
    pub fn load(&mut self, source: impl Into<ConfigSource>) -> Result<&ConfigFile> {
        let config = load_and_validate(source, &self.registry)?;
        info!(commands = config.len(), "configuration loaded");
        Ok(&*self.config.insert(config))
    }

    pub fn config(&self) -> Option<&ConfigFile> {
        self.config.as_ref()
    }

    /// Run every loaded command to completion (or abort).
    pub async fn run(&self) -> Result<RunOutcome> {
        let config = self.config.as_ref().ok_or_else(|| {
            errors::RunnerError::config("<root>", "configuration", "no configuration loaded")
        })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<RuntimeEvent>();
        spawn_signal_listener(event_tx.clone());

        // Constructed before anything is spawned.
        let processes = LiveProcesses::new();
        let coordinator = Coordinator::new(processes.clone());

        let (parent, parent_writers) = ParentOutput::spawn();
        let (executor, executor_task) = RealExecutorBackend::new(SupervisorContext {
            observer: Arc::new(ChannelObserver::new(event_tx)),
            processes,
            parent,
        });

        let core = CoreRuntime::new(Scheduler::from_config(config));
        // The runtime owns (and drops) the executor's only sender.
        let outcome = Runtime::new(core, event_rx, executor, coordinator).run().await;

        drain_output(executor_task, parent_writers).await;
        outcome
    }
}

/// Wait for supervisors to deliver their last output and for the parent
/// writers to flush it, bounded by [`SHUTDOWN_DRAIN_GRACE`].
async fn drain_output(executor_task: JoinHandle<()>, parent_writers: ParentWriters) {
    let deadline = Instant::now() + SHUTDOWN_DRAIN_GRACE;
    match timeout_at(deadline, executor_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "executor loop failed"),
        Err(_) => warn!("supervisors still running after shutdown grace period"),
    }
    if parent_writers.finish(deadline).await {
        debug!("command output drained");
    }
}

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut runner = Runner::new();
    let cfg = runner.load(args.config.clone())?;

    if args.dry_run {
        print_dry_run(cfg);
        return Ok(0);
    }

    let outcome = runner.run().await?;
    if let Some(failure) = &outcome.failure {
        error!(command = ?failure.command, reason = %failure.reason, "run aborted");
        eprintln!("Runner aborted with error: {failure}");
    }
    Ok(outcome.exit_code)
}

/// SIGINT / SIGTERM → shutdown request.
fn spawn_signal_listener(tx: mpsc::UnboundedSender<RuntimeEvent>) {
    tokio::spawn(async move {
        let signal = match wait_for_termination().await {
            Ok(signal) => signal,
            Err(e) => {
                error!(error = %e, "failed to listen for termination signals");
                return;
            }
        };
        info!(%signal, "termination requested");
        let _ = tx.send(RuntimeEvent::ShutdownRequested {
            trigger: ShutdownTrigger::Signal(signal),
        });
    });
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<TerminationSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| TerminationSignal::Interrupt),
        _ = sigterm.recv() => Ok(TerminationSignal::Terminate),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<TerminationSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(TerminationSignal::Interrupt)
}

/// Simple dry-run output: print commands in dependency order.
fn print_dry_run(cfg: &ConfigFile) {
    let graph = DagGraph::from_config(cfg);

    println!("command-runner dry-run");
    println!("commands ({}):", cfg.len());
    for (name, spec) in cfg.commands.iter() {
        println!("  - {name}");
        println!("      cmd: {:?}", spec.argv);
        if let Some(cwd) = &spec.working_directory {
            println!("      cwd: {}", cwd.display());
        }
        let deps = graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("      depends: {deps:?}");
        }
        if let Some(wait) = &spec.wait {
            println!("      wait: {}", wait.kind());
        }
        if let Some(log) = &spec.log {
            println!("      log: {}", log.kind());
        }
        if spec.exit_on_success {
            println!("      exit_on_success: true");
        }
        if !spec.abort_on_error {
            println!("      abort_on_error: false");
        }
    }
    println!("roots: {:?}", graph.roots().collect::<Vec<_>>());

    debug!("dry-run complete (no execution)");
}
