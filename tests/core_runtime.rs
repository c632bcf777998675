// tests/core_runtime.rs

use command_runner::dag::{CommandState, Scheduler};
use command_runner::engine::{
    CoreCommand, CoreRuntime, ExitOutcome, RunStatus, RuntimeEvent, ShutdownTrigger,
};
use command_runner_test_utils::{CommandBuilder, ConfigBuilder};

fn core(builder: ConfigBuilder) -> CoreRuntime {
    CoreRuntime::new(Scheduler::from_config(&builder.build()))
}

fn spawned(name: &str) -> RuntimeEvent {
    RuntimeEvent::CommandSpawned {
        command: name.to_string(),
        pid: Some(42),
    }
}

fn ready(name: &str) -> RuntimeEvent {
    RuntimeEvent::CommandReady {
        command: name.to_string(),
    }
}

fn exited(name: &str, code: i32) -> RuntimeEvent {
    RuntimeEvent::CommandExited {
        command: name.to_string(),
        outcome: ExitOutcome::from_code(Some(code)),
    }
}

#[test]
fn only_the_first_failure_requests_shutdown() {
    let mut core = core(
        ConfigBuilder::new()
            .with_command("a", CommandBuilder::new("a"))
            .with_command("b", CommandBuilder::new("b"))
            .with_command("c", CommandBuilder::new("c").depends("a")),
    );

    let start = core.start();
    let mut roots = start.dispatched();
    roots.sort();
    assert_eq!(roots, vec!["a", "b"]);

    core.step(spawned("a"));
    core.step(spawned("b"));

    let first = core.step(RuntimeEvent::CommandFailed {
        command: "b".to_string(),
        reason: "boom".to_string(),
    });
    assert!(!first.keep_running);
    assert!(matches!(first.shutdown(), Some(ShutdownTrigger::Abort(f)) if f.reason == "boom"));
    assert_eq!(core.status(), RunStatus::Aborting);

    // Work after the abort: no dispatch, no second shutdown.
    let later = core.step(ready("a"));
    assert!(later.commands.is_empty());
    assert_eq!(core.scheduler().state_of("c"), Some(CommandState::Pending));

    let second = core.step(RuntimeEvent::CommandFailed {
        command: "a".to_string(),
        reason: "again".to_string(),
    });
    assert!(second.commands.is_empty());
    assert_eq!(core.failure().map(|f| f.reason.as_str()), Some("boom"));
}

#[test]
fn run_finishes_only_when_every_process_is_gone() {
    let mut core = core(
        ConfigBuilder::new()
            .with_command("server", CommandBuilder::new("server"))
            .with_command("job", CommandBuilder::new("job").depends("server")),
    );

    core.start();
    core.step(spawned("server"));
    let step = core.step(ready("server"));
    assert_eq!(step.dispatched(), vec!["job"]);

    core.step(spawned("job"));
    core.step(ready("job"));
    let step = core.step(exited("job", 0));
    assert!(step.keep_running, "server is still alive");
    assert_eq!(core.live_count(), 1);

    let step = core.step(exited("server", 0));
    assert!(matches!(
        step.shutdown(),
        Some(ShutdownTrigger::Exit { reason }) if reason == "all commands have finished"
    ));
}

#[test]
fn done_wait_exit_before_readiness_still_releases_dependents() {
    let mut core = core(
        ConfigBuilder::new()
            .with_command(
                "build",
                CommandBuilder::new("build").wait("done", serde_json::json!({})),
            )
            .with_command("serve", CommandBuilder::new("serve").depends("build")),
    );

    core.start();
    core.step(spawned("build"));
    assert_eq!(core.scheduler().state_of("build"), Some(CommandState::Waiting));

    let step = core.step(exited("build", 0));
    assert!(step.keep_running);
    assert_eq!(core.scheduler().state_of("build"), Some(CommandState::Exited));

    let step = core.step(ready("build"));
    assert_eq!(step.dispatched(), vec!["serve"]);
}

#[test]
fn exit_on_success_wins_over_remaining_work() {
    let mut core = core(
        ConfigBuilder::new()
            .with_command("check", CommandBuilder::new("check").exit_on_success(true))
            .with_command("later", CommandBuilder::new("later").depends("check")),
    );

    core.start();
    core.step(spawned("check"));
    let step = core.step(exited("check", 0));
    assert!(matches!(step.shutdown(), Some(ShutdownTrigger::Exit { .. })));
    assert!(step.dispatched().is_empty());

    // Readiness arriving after shutdown dispatches nothing.
    let step = core.step(ready("check"));
    assert!(step.commands.iter().all(|c| !matches!(c, CoreCommand::Dispatch(_))));
}
