#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use command_runner::config::ConfigFile;
use command_runner::dag::Scheduler;
use command_runner::engine::{Coordinator, CoreRuntime, RunOutcome, Runtime, RuntimeEvent};
use command_runner::exec::LiveProcesses;
use command_runner::Runner;
use command_runner_test_utils::{ConfigBuilder, FakeExecutor};
use serde_json::Value;
use tokio::sync::mpsc;

pub use command_runner_test_utils::{init_tracing, with_timeout};

/// Run `cfg` against a [`FakeExecutor`] configured by `setup`.
///
/// Returns the outcome and the dispatched command names, in order.
pub async fn run_with_fake(
    cfg: &ConfigFile,
    setup: impl FnOnce(FakeExecutor) -> FakeExecutor,
) -> (RunOutcome, Vec<String>) {
    let (tx, rx) = mpsc::unbounded_channel::<RuntimeEvent>();
    run_with_fake_channel(cfg, tx, rx, setup).await
}

/// Like [`run_with_fake`], with a caller-provided event channel.
pub async fn run_with_fake_channel(
    cfg: &ConfigFile,
    tx: mpsc::UnboundedSender<RuntimeEvent>,
    rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    setup: impl FnOnce(FakeExecutor) -> FakeExecutor,
) -> (RunOutcome, Vec<String>) {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = setup(FakeExecutor::new(tx, Arc::clone(&executed)));

    let core = CoreRuntime::new(Scheduler::from_config(cfg));
    let coordinator = Coordinator::new(LiveProcesses::new());
    let runtime = Runtime::new(core, rx, executor, coordinator);

    let outcome = with_timeout(runtime.run())
        .await
        .expect("runtime failed");
    let executed = executed.lock().unwrap().clone();
    (outcome, executed)
}

/// Load `cfg` into a real [`Runner`] and run it with real processes.
pub async fn run_real(cfg: Value) -> RunOutcome {
    let mut runner = Runner::new();
    runner.load(cfg).expect("configuration should be valid");
    tokio::time::timeout(Duration::from_secs(10), runner.run())
        .await
        .expect("run timed out")
        .expect("run failed")
}

pub async fn run_builder(builder: ConfigBuilder) -> RunOutcome {
    run_real(builder.to_value()).await
}
